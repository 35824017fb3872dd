use crate::error::WriteError;
use base64::{engine::general_purpose, Engine};
use std::fs;
use std::path::{Path, PathBuf};

/// A decoded image and where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OutputWriter {
    output_dir: PathBuf,
    extension: String,
}

impl OutputWriter {
    /// The directory must already exist.
    pub fn new(output_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn path_for(&self, trend: &str, index: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.{}", sanitize_trend(trend), index, self.extension))
    }

    /// Decodes every payload first, so a bad payload leaves no files behind.
    pub fn write(&self, images: &[String], trend: &str) -> Result<Vec<SavedImage>, WriteError> {
        let decoded = images
            .iter()
            .enumerate()
            .map(|(index, payload)| {
                decode_payload(payload).map_err(|source| WriteError::Decode { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut saved = Vec::with_capacity(decoded.len());
        for (index, bytes) in decoded.into_iter().enumerate() {
            let path = self.path_for(trend, index);
            fs::write(&path, &bytes).map_err(|source| WriteError::Io {
                path: path.clone(),
                source,
            })?;
            log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
            saved.push(SavedImage { path, bytes });
        }
        Ok(saved)
    }
}

/// Replaces every character outside `[A-Za-z0-9]` with `_`.
pub fn sanitize_trend(trend: &str) -> String {
    trend
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Drops a `data:...;base64,` style header (everything through the first comma).
pub fn strip_data_uri(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, data)) => data,
        None => payload,
    }
}

pub fn decode_payload(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    general_purpose::STANDARD.decode(strip_data_uri(payload).trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG
    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_sanitize_trend() {
        assert_eq!(sanitize_trend("AI/ML 2024!"), "AI_ML_2024_");
        assert_eq!(sanitize_trend("Cats"), "Cats");
        assert_eq!(sanitize_trend("café"), "caf_");
    }

    #[test]
    fn test_strip_data_uri() {
        assert_eq!(strip_data_uri("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_uri("AAAA"), "AAAA");
        assert_eq!(decode_payload("data:image/png;base64,AAAA").unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn test_write_single_image() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path(), "png");

        let saved = writer.write(&[PNG_B64.to_string()], "Cats").unwrap();

        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].path, dir.path().join("Cats_0.png"));
        let expected = general_purpose::STANDARD.decode(PNG_B64).unwrap();
        assert_eq!(fs::read(&saved[0].path).unwrap(), expected);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_unsafe_trend_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path(), "png");
        let payloads = vec![
            PNG_B64.to_string(),
            format!("data:image/png;base64,{}", PNG_B64),
        ];

        let saved = writer.write(&payloads, "AI/ML 2024!").unwrap();

        assert_eq!(saved[0].path, dir.path().join("AI_ML_2024__0.png"));
        assert_eq!(saved[1].path, dir.path().join("AI_ML_2024__1.png"));
        assert_eq!(saved[0].bytes, saved[1].bytes);
    }

    #[test]
    fn test_invalid_base64_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path(), "png");

        let err = writer
            .write(&[PNG_B64.to_string(), "not base64!!".to_string()], "Cats")
            .unwrap_err();

        assert!(matches!(err, WriteError::Decode { index: 1, .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path().join("gone"), "png");

        let err = writer.write(&[PNG_B64.to_string()], "Cats").unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
    }
}
