use crate::{
    config::Config,
    error::{FailureKind, SourceError},
    logger::{LogLevel, Reporter},
    manifest::Manifest,
    models::{BatchOutcome, FailureRecord, InputRecord, RecordOutcome},
    prompt::RequestBuilder,
    sdapi::ImageGenerator,
    writer::{OutputWriter, SavedImage},
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Inserts the pause between endpoint calls.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Everything learned while processing one row.
struct Processed {
    trend: String,
    prompt: Option<String>,
    outcome: RecordOutcome,
    saved: Vec<SavedImage>,
    attempted: bool,
}

impl Processed {
    fn skipped(trend: &str, reason: impl Into<String>) -> Self {
        Self {
            trend: trend.to_string(),
            prompt: None,
            outcome: RecordOutcome::Skipped {
                reason: reason.into(),
            },
            saved: Vec::new(),
            attempted: false,
        }
    }

    fn failed(record: &InputRecord, prompt: String, kind: FailureKind, detail: String) -> Self {
        Self {
            trend: record.trend().to_string(),
            prompt: Some(prompt),
            outcome: RecordOutcome::Failed(FailureRecord {
                row: record.row,
                trend: record.trend().to_string(),
                kind,
                detail,
            }),
            saved: Vec::new(),
            attempted: true,
        }
    }
}

/// Sequential runner: one record is fully handled before the next starts.
pub struct BatchDriver {
    builder: RequestBuilder,
    generator: Arc<dyn ImageGenerator>,
    writer: OutputWriter,
    reporter: Arc<dyn Reporter>,
    pacer: Arc<dyn Pacer>,
    manifest: Option<Manifest>,
    cooldown: Duration,
    max_retries: u32,
    retry_delay: Duration,
    max_consecutive_io_failures: u32,
}

impl BatchDriver {
    pub fn new(
        config: &Config,
        generator: Arc<dyn ImageGenerator>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            builder: RequestBuilder::new(config.generation.clone()),
            generator,
            writer: OutputWriter::new(&config.output_dir, &config.image_extension),
            reporter,
            pacer: Arc::new(TokioPacer),
            manifest: None,
            cooldown: config.cooldown(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            max_consecutive_io_failures: config.max_consecutive_io_failures,
        }
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub async fn run<I>(&mut self, records: I) -> BatchOutcome
    where
        I: IntoIterator<Item = Result<InputRecord, SourceError>>,
    {
        let mut outcome = BatchOutcome::new();
        let mut consecutive_io_failures = 0u32;
        let mut records = records.into_iter().peekable();

        self.reporter.record(
            LogLevel::Info,
            "🚀 Batch started",
            json!({
                "output_dir": self.writer.output_dir().display().to_string(),
                "cooldown_ms": self.cooldown.as_millis() as u64,
                "max_retries": self.max_retries,
            }),
        );

        while let Some(next) = records.next() {
            let processed = match next {
                Ok(record) => self.process(&record).await,
                Err(err) => {
                    self.reporter.record(
                        LogLevel::Warn,
                        "Skipping unreadable row",
                        json!({ "error": err.to_string() }),
                    );
                    Processed::skipped("", format!("unreadable row: {}", err))
                }
            };

            if processed.attempted {
                outcome.attempted += 1;
            }
            outcome.tally(&processed.outcome);
            self.append_manifest(&processed);

            match &processed.outcome {
                RecordOutcome::Failed(failure) if failure.kind == FailureKind::IoError => {
                    consecutive_io_failures += 1;
                }
                _ => consecutive_io_failures = 0,
            }
            if self.max_consecutive_io_failures > 0
                && consecutive_io_failures >= self.max_consecutive_io_failures
            {
                self.reporter.record(
                    LogLevel::Error,
                    "Aborting batch after repeated disk failures",
                    json!({ "consecutive_io_failures": consecutive_io_failures }),
                );
                outcome.aborted = true;
                break;
            }

            if records.peek().is_some() {
                self.pacer.pause(self.cooldown).await;
            }
        }

        let level = if outcome.failed > 0 || outcome.aborted {
            LogLevel::Warn
        } else {
            LogLevel::Info
        };
        self.reporter.record(
            level,
            "🏁 Batch finished",
            json!({
                "attempted": outcome.attempted,
                "succeeded": outcome.succeeded,
                "skipped": outcome.skipped,
                "failed": outcome.failed,
                "aborted": outcome.aborted,
            }),
        );

        outcome
    }

    async fn process(&self, record: &InputRecord) -> Processed {
        if !record.has_trend() {
            self.reporter.record(
                LogLevel::Warn,
                "Skipping row with empty trend",
                json!({ "row": record.row }),
            );
            return Processed::skipped(record.trend(), "empty trend");
        }

        let trend = record.trend();
        let request = self.builder.build(record);
        let started = Instant::now();
        let mut retries = 0u32;

        let images = loop {
            match self.generator.txt2img(&request).await {
                Ok(images) => break images,
                Err(err)
                    if err.kind() == FailureKind::TransportFailure
                        && retries < self.max_retries =>
                {
                    retries += 1;
                    self.reporter.record(
                        LogLevel::Warn,
                        "Generation request failed, retrying",
                        json!({
                            "row": record.row,
                            "trend": trend,
                            "retry": retries,
                            "error": err.to_string(),
                        }),
                    );
                    self.pacer.pause(self.retry_delay).await;
                }
                Err(err) => {
                    let kind = err.kind();
                    self.report_failure(record, kind, &err.to_string());
                    return Processed::failed(record, request.prompt, kind, err.to_string());
                }
            }
        };

        match self.writer.write(&images, trend) {
            Ok(saved) => {
                let files: Vec<_> = saved.iter().map(|image| image.path.clone()).collect();
                self.reporter.record(
                    LogLevel::Info,
                    "✅ Generated images",
                    json!({
                        "row": record.row,
                        "trend": trend,
                        "files": files.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
                        "duration_ms": started.elapsed().as_millis() as u64,
                    }),
                );
                Processed {
                    trend: trend.to_string(),
                    prompt: Some(request.prompt),
                    outcome: RecordOutcome::Succeeded { files },
                    saved,
                    attempted: true,
                }
            }
            Err(err) => {
                let kind = err.kind();
                self.report_failure(record, kind, &err.to_string());
                Processed::failed(record, request.prompt, kind, err.to_string())
            }
        }
    }

    fn report_failure(&self, record: &InputRecord, kind: FailureKind, detail: &str) {
        self.reporter.record(
            LogLevel::Error,
            "❌ Record failed",
            json!({
                "row": record.row,
                "trend": record.trend(),
                "kind": kind.as_str(),
                "persistence": kind.is_persistence(),
                "error": detail,
            }),
        );
    }

    fn append_manifest(&mut self, processed: &Processed) {
        let Some(manifest) = self.manifest.as_mut() else {
            return;
        };
        if let Err(err) = manifest.append(
            &processed.trend,
            processed.prompt.as_deref(),
            &processed.outcome,
            &processed.saved,
        ) {
            self.reporter.record(
                LogLevel::Warn,
                "Failed to update manifest",
                json!({
                    "path": manifest.path().display().to_string(),
                    "error": err.to_string(),
                }),
            );
        }
    }
}
