use crate::config::Config;
use crate::error::TrendgenError;
use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, Metadata, Record};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

static BEAUTIFUL_LOGGER: Lazy<BeautifulLogger> = Lazy::new(BeautifulLogger::new);

pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    BEAUTIFUL_LOGGER.update_config(config.clone())?;

    if let Err(e) = log::set_logger(&*BEAUTIFUL_LOGGER) {
        return Err(format!("Failed to set logger: {:?}", e));
    }

    log::set_max_level(config.min_level.to_log_level_filter());
    Ok(())
}

/// Sends a prepared entry straight to the installed sinks.
pub fn emit(entry: LogEntry) {
    BEAUTIFUL_LOGGER.dispatch(entry);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    pub fn color(&self) -> Color {
        match self {
            LogLevel::Trace => Color::Cyan,
            LogLevel::Debug => Color::Blue,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            LogLevel::Trace => "🔍",
            LogLevel::Debug => "🐛",
            LogLevel::Info => "💡",
            LogLevel::Warn => "⚠️",
            LogLevel::Error => "❌",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Convert to log crate's Level
    pub fn to_log_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::Trace,
            LogLevel::Debug => Level::Debug,
            LogLevel::Info => Level::Info,
            LogLevel::Warn => Level::Warn,
            LogLevel::Error => Level::Error,
        }
    }

    pub fn to_log_level_filter(&self) -> log::LevelFilter {
        self.to_log_level().to_level_filter()
    }

    pub fn from_log_level(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

impl FromStr for LogLevel {
    type Err = TrendgenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(TrendgenError::ConfigError(format!(
                "unknown log level '{}'",
                other
            ))),
        }
    }
}

/// Structured log entry with rich metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub module: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub context: HashMap<String, serde_json::Value>,
    pub duration_ms: Option<u64>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level,
            message: message.into(),
            module: module.into(),
            file: None,
            line: None,
            context: HashMap::new(),
            duration_ms: None,
        }
    }

    pub fn with_location(mut self, file: &str, line: u32) -> Self {
        self.file = Some(file.to_string());
        self.line = Some(line);
        self
    }

    pub fn with_context(mut self, key: &str, value: serde_json::Value) -> Self {
        self.context.insert(key.to_string(), value);
        self
    }

    /// Merges every key of a JSON object into the context. Non-object values
    /// are stored under `fields`.
    pub fn with_fields(mut self, fields: serde_json::Value) -> Self {
        match fields {
            serde_json::Value::Object(map) => self.context.extend(map),
            serde_json::Value::Null => {}
            other => {
                self.context.insert("fields".to_string(), other);
            }
        }
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(duration.as_millis() as u64);
        self
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub show_colors: bool,
    pub show_emojis: bool,
    pub show_file_location: bool,
    pub show_module: bool,
    pub include_timestamp: bool,
    pub timestamp_format: String,
    pub output_json: bool,
    pub log_to_file: bool,
    pub log_file_path: String,
    pub custom_prefix: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: true,
            show_emojis: true,
            show_file_location: false,
            show_module: true,
            include_timestamp: true,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            output_json: false,
            log_to_file: false,
            log_file_path: "trendgen.log".to_string(),
            custom_prefix: None,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_file_output(mut self, path: &str) -> Self {
        self.log_to_file = true;
        self.log_file_path = path.to_string();
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.custom_prefix = Some(prefix.to_string());
        self
    }

    /// One JSON object per line on stdout and in the log file.
    pub fn production() -> Self {
        Self {
            show_colors: false,
            show_emojis: false,
            ..Default::default()
        }
        .with_json_output(true)
    }

    /// Sinks for a batch run: level, output format and log file from `config`.
    pub fn from_config(config: &Config) -> Self {
        let base = if config.log_json {
            Self::production()
        } else {
            Self::new()
        };
        let logger_config = base.with_level(config.log_level).with_prefix("trendgen");
        match &config.log_file {
            Some(path) => logger_config.with_file_output(&path.to_string_lossy()),
            None => logger_config,
        }
    }
}

/// Console + file sink behind the `log` facade.
pub struct BeautifulLogger {
    config: Mutex<LoggerConfig>,
    log_file: Mutex<Option<File>>,
}

impl BeautifulLogger {
    pub fn new() -> Self {
        Self {
            config: Mutex::new(LoggerConfig::default()),
            log_file: Mutex::new(None),
        }
    }

    pub fn update_config(&self, new_config: LoggerConfig) -> Result<(), String> {
        if new_config.log_to_file {
            let path = Path::new(&new_config.log_file_path);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create log directory: {}", e))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    format!("Failed to open log file {}: {}", new_config.log_file_path, e)
                })?;
            if let Ok(mut log_file) = self.log_file.lock() {
                *log_file = Some(file);
            }
        }

        if let Ok(mut config) = self.config.lock() {
            *config = new_config;
        }
        Ok(())
    }

    fn format_line(&self, entry: &LogEntry, config: &LoggerConfig, colors: bool) -> String {
        let mut output = String::new();

        if let Some(prefix) = &config.custom_prefix {
            if colors {
                output.push_str(&format!("[{}] ", prefix.bright_white().bold()));
            } else {
                output.push_str(&format!("[{}] ", prefix));
            }
        }

        if config.include_timestamp {
            let timestamp = entry.timestamp.format(&config.timestamp_format).to_string();
            if colors {
                output.push_str(&format!("{} ", timestamp.bright_black()));
            } else {
                output.push_str(&format!("{} ", timestamp));
            }
        }

        let level_str = if config.show_emojis {
            format!("{} {}", entry.level.emoji(), entry.level.as_str())
        } else {
            entry.level.as_str().to_string()
        };

        if colors {
            output.push_str(&format!(
                "[{}] ",
                level_str.color(entry.level.color()).bold()
            ));
        } else {
            output.push_str(&format!("[{}] ", level_str));
        }

        if config.show_module && !entry.module.is_empty() {
            if colors {
                output.push_str(&format!("{}::", entry.module.bright_blue()));
            } else {
                output.push_str(&format!("{}::", entry.module));
            }
        }

        if colors {
            output.push_str(&entry.message.white().bold().to_string());
        } else {
            output.push_str(&entry.message);
        }

        if !entry.context.is_empty() {
            let context = serde_json::to_string(&entry.context).unwrap_or_default();
            output.push(' ');
            if colors {
                output.push_str(&context.bright_cyan().to_string());
            } else {
                output.push_str(&context);
            }
        }

        if let Some(duration) = entry.duration_ms {
            if colors {
                output.push_str(&format!(" [{}ms]", duration.to_string().bright_magenta()));
            } else {
                output.push_str(&format!(" [{}ms]", duration));
            }
        }

        if config.show_file_location {
            if let (Some(file), Some(line)) = (&entry.file, entry.line) {
                let location = format!("{}:{}", file, line);
                if colors {
                    output.push_str(&format!(" ({})", location.bright_black()));
                } else {
                    output.push_str(&format!(" ({})", location));
                }
            }
        }

        output
    }

    fn write_to_file(&self, entry: &LogEntry, config: &LoggerConfig) {
        if let Ok(mut log_file_guard) = self.log_file.lock() {
            if let Some(ref mut file) = *log_file_guard {
                // Files never get ANSI escapes.
                let content = if config.output_json {
                    serde_json::to_string(entry).unwrap_or_default() + "\n"
                } else {
                    self.format_line(entry, config, false) + "\n"
                };
                let _ = file.write_all(content.as_bytes());
                let _ = file.flush();
            }
        }
    }

    fn dispatch(&self, entry: LogEntry) {
        let Ok(config) = self.config.lock() else {
            return;
        };
        if entry.level < config.min_level {
            return;
        }

        if config.output_json {
            println!("{}", serde_json::to_string(&entry).unwrap_or_default());
        } else {
            println!("{}", self.format_line(&entry, &config, config.show_colors));
        }

        if config.log_to_file {
            self.write_to_file(&entry, &config);
        }
    }

    fn create_log_entry(&self, record: &Record) -> LogEntry {
        let entry = LogEntry::new(
            LogLevel::from_log_level(record.level()),
            record.args().to_string(),
            record.module_path().unwrap_or("unknown"),
        );
        match (record.file(), record.line()) {
            (Some(file), Some(line)) => entry.with_location(file, line),
            _ => entry,
        }
    }
}

impl Default for BeautifulLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl log::Log for BeautifulLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if let Ok(config) = self.config.lock() {
            metadata.level() <= config.min_level.to_log_level()
        } else {
            true
        }
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.dispatch(self.create_log_entry(record));
        }
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
        if let Ok(mut log_file_guard) = self.log_file.lock() {
            if let Some(ref mut file) = *log_file_guard {
                let _ = file.flush();
            }
        }
    }
}

/// Structured event sink used by the batch driver.
pub trait Reporter: Send + Sync {
    fn record(&self, level: LogLevel, message: &str, fields: serde_json::Value);
}

/// Reporter backed by the process-wide [`BeautifulLogger`].
#[derive(Debug, Clone)]
pub struct LogReporter {
    module: String,
}

impl LogReporter {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
        }
    }
}

impl Default for LogReporter {
    fn default() -> Self {
        Self::new("trendgen::batch")
    }
}

impl Reporter for LogReporter {
    fn record(&self, level: LogLevel, message: &str, fields: serde_json::Value) {
        emit(LogEntry::new(level, message, self.module.as_str()).with_fields(fields));
    }
}

/// Performance timer for measuring operation duration
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::info!("⏱️  Starting timer: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!(
            "⏱️  Timer '{}' completed in {:.2}s",
            self.name,
            self.elapsed().as_secs_f64()
        );
    }
}

pub fn timer(name: &str) -> Timer {
    Timer::new(name)
}

/// Log the effective configuration of a batch run
pub fn log_config_info(config: &Config) {
    log::info!("⚙️  Configuration loaded:");
    log::info!("   Endpoint: {}", config.txt2img_url());
    log::info!("   Input: {}", config.input_path.display());
    log::info!("   Output: {}", config.output_dir.display());
    log::info!(
        "   Timeout: {}s, cooldown: {}s, retries: {}",
        config.timeout_seconds,
        config.cooldown_seconds,
        config.max_retries
    );
    log::info!(
        "   Generation: {}x{}, {} steps, cfg {}, sampler '{}', batch {}",
        config.generation.width,
        config.generation.height,
        config.generation.steps,
        config.generation.cfg_scale,
        config.generation.sampler,
        config.generation.batch_size
    );
    log::info!(
        "   Manifest: {}",
        match &config.manifest_path {
            Some(path) => format!("✅ {}", path.display()),
            None => "❌".to_string(),
        }
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_levels() {
        assert_eq!(LogLevel::Info.as_str(), "INFO");
        assert_eq!(LogLevel::Error.emoji(), "❌");
        assert_eq!(LogLevel::Debug.color(), Color::Blue);
        assert!(LogLevel::Warn > LogLevel::Info);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_logger_config() {
        let prod_config = LoggerConfig::production();
        assert!(!prod_config.show_colors);
        assert!(prod_config.output_json);
        assert!(!prod_config.log_to_file);
    }

    #[test]
    fn test_logger_config_from_run_config() {
        let mut config = Config::default().with_log_file(None);
        config.log_level = LogLevel::Debug;
        let logger_config = LoggerConfig::from_config(&config);
        assert_eq!(logger_config.min_level, LogLevel::Debug);
        assert!(!logger_config.output_json);
        assert!(logger_config.show_colors);
        assert!(!logger_config.log_to_file);
        assert_eq!(logger_config.custom_prefix.as_deref(), Some("trendgen"));

        config.log_json = true;
        let config = config.with_log_file(Some("logs/run.log".into()));
        let logger_config = LoggerConfig::from_config(&config);
        assert!(logger_config.output_json);
        assert!(!logger_config.show_colors);
        assert!(logger_config.log_to_file);
        assert_eq!(logger_config.log_file_path, "logs/run.log");
    }

    #[test]
    fn test_json_file_sink_writes_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let logger = BeautifulLogger::new();
        logger
            .update_config(LoggerConfig::production().with_file_output(path.to_str().unwrap()))
            .unwrap();

        logger.dispatch(
            LogEntry::new(LogLevel::Error, "record failed", "trendgen::batch")
                .with_fields(json!({"row": 4, "kind": "TransportFailure"})),
        );

        let contents = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(value["message"], json!("record failed"));
        assert_eq!(value["context"]["kind"], json!("TransportFailure"));
    }

    #[test]
    fn test_entry_fields_merge() {
        let entry = LogEntry::new(LogLevel::Warn, "skipped", "test")
            .with_fields(json!({"trend": "Cats", "row": 3}))
            .with_context("kind", json!("EmptyRecordSkip"));
        assert_eq!(entry.context.len(), 3);
        assert_eq!(entry.context["trend"], json!("Cats"));
    }

    #[test]
    fn test_plain_line_has_no_escapes() {
        let logger = BeautifulLogger::new();
        let config = LoggerConfig::new().with_prefix("trendgen");
        let entry = LogEntry::new(LogLevel::Info, "saved", "trendgen::batch")
            .with_context("trend", json!("Cats"))
            .with_duration(Duration::from_millis(1500));
        let line = logger.format_line(&entry, &config, false);
        assert!(line.starts_with("[trendgen] "));
        assert!(line.contains("[💡 INFO] trendgen::batch::saved {\"trend\":\"Cats\"} [1500ms]"));
        assert!(!line.contains('\u{1b}'));
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.log");
        let logger = BeautifulLogger::new();
        logger
            .update_config(LoggerConfig::new().with_file_output(path.to_str().unwrap()))
            .unwrap();

        logger.dispatch(LogEntry::new(LogLevel::Info, "batch started", "test"));
        logger.dispatch(LogEntry::new(LogLevel::Debug, "filtered out", "test"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("batch started"));
    }

    #[test]
    fn test_logger_initialization() {
        let config = LoggerConfig::new().with_level(LogLevel::Debug);
        assert!(init_with_config(config).is_ok());
    }
}
