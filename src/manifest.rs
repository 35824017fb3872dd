use crate::{
    error::Result,
    models::RecordOutcome,
    writer::SavedImage,
};
use chrono::Utc;
use csv::{Writer, WriterBuilder};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

const HEADER: [&str; 6] = ["timestamp", "trend", "status", "files", "prompt", "detail"];

/// Append-only CSV audit trail, one row per processed record.
pub struct Manifest {
    path: PathBuf,
    writer: Writer<File>,
}

impl Manifest {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &mut self,
        trend: &str,
        prompt: Option<&str>,
        outcome: &RecordOutcome,
        saved: &[SavedImage],
    ) -> Result<()> {
        let files = saved
            .iter()
            .map(|image| image.path.display().to_string())
            .collect::<Vec<_>>()
            .join(";");

        let detail = match outcome {
            RecordOutcome::Succeeded { .. } => saved
                .iter()
                .map(|image| hex::encode(Sha256::digest(&image.bytes)))
                .collect::<Vec<_>>()
                .join(";"),
            RecordOutcome::Skipped { reason } => reason.clone(),
            RecordOutcome::Failed(failure) => format!("{}: {}", failure.kind, failure.detail),
        };

        let timestamp = Utc::now().to_rfc3339();
        self.writer
            .write_record([
                timestamp.as_str(),
                trend,
                outcome.status(),
                files.as_str(),
                prompt.unwrap_or(""),
                detail.as_str(),
            ])?;
        self.writer.flush()?;
        Ok(())
    }
}
