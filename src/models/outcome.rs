use crate::error::FailureKind;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub row: usize,
    pub trend: String,
    pub kind: FailureKind,
    pub detail: String,
}

/// Result of processing a single record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Succeeded { files: Vec<PathBuf> },
    Skipped { reason: String },
    Failed(FailureRecord),
}

impl RecordOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            RecordOutcome::Succeeded { .. } => "succeeded",
            RecordOutcome::Skipped { .. } => "skipped",
            RecordOutcome::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    /// Records for which the endpoint was called at least once.
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<FailureRecord>,
    /// Set when the run stopped early on repeated disk failures.
    pub aborted: bool,
}

impl BatchOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tally(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Succeeded { .. } => self.succeeded += 1,
            RecordOutcome::Skipped { .. } => self.skipped += 1,
            RecordOutcome::Failed(failure) => {
                self.failed += 1;
                self.failures.push(failure.clone());
            }
        }
    }

    pub fn records_read(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}
