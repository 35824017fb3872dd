use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrendgenError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("Input header of {} is unreadable: {source}", path.display())]
    InputHeader { path: PathBuf, source: csv::Error },
    #[error("Input error: {0}")]
    SourceError(#[from] SourceError),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Client error: {0}")]
    ClientError(String),
    #[error("Logger error: {0}")]
    LoggerError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrendgenError>;

/// Errors raised while reading rows from the input file.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Failures talking to the generation endpoint.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response body: {0}")]
    Malformed(String),
}

impl GenerationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            GenerationError::Transport(_)
            | GenerationError::Timeout(_)
            | GenerationError::Status { .. } => FailureKind::TransportFailure,
            GenerationError::Malformed(_) => FailureKind::MalformedResponse,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::Timeout(err.to_string())
        } else {
            GenerationError::Transport(err.to_string())
        }
    }
}

/// Failures persisting decoded images.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("image {index} is not valid base64: {source}")]
    Decode {
        index: usize,
        #[source]
        source: base64::DecodeError,
    },
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WriteError {
    pub fn kind(&self) -> FailureKind {
        match self {
            WriteError::Decode { .. } => FailureKind::DecodeError,
            WriteError::Io { .. } => FailureKind::IoError,
        }
    }
}

/// Classification of a per-record failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FailureKind {
    TransportFailure,
    MalformedResponse,
    DecodeError,
    IoError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::TransportFailure => "TransportFailure",
            FailureKind::MalformedResponse => "MalformedResponse",
            FailureKind::DecodeError => "DecodeError",
            FailureKind::IoError => "IoError",
        }
    }

    /// The generation itself succeeded but its images could not be saved.
    pub fn is_persistence(&self) -> bool {
        matches!(self, FailureKind::DecodeError | FailureKind::IoError)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_kinds() {
        assert_eq!(
            GenerationError::Status {
                status: 502,
                body: String::new()
            }
            .kind(),
            FailureKind::TransportFailure
        );
        assert_eq!(
            GenerationError::Timeout("slow".into()).kind(),
            FailureKind::TransportFailure
        );
        assert_eq!(
            GenerationError::Malformed("no images".into()).kind(),
            FailureKind::MalformedResponse
        );
    }

    #[test]
    fn test_persistence_kinds() {
        assert!(FailureKind::DecodeError.is_persistence());
        assert!(FailureKind::IoError.is_persistence());
        assert!(!FailureKind::TransportFailure.is_persistence());
        assert_eq!(FailureKind::IoError.to_string(), "IoError");
    }
}
