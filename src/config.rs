use crate::error::{Result, TrendgenError};
use crate::logger::LogLevel;
use crate::sdapi;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const ENV_PREFIX: &str = "TRENDGEN_";

/// Parameters of the txt2img payload, shared by every record in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Prompt template; `{trend}` and `{volume}` are substituted per record.
    pub prompt_template: String,
    pub style_qualifiers: Vec<String>,
    pub negative_prompt: String,
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    pub cfg_scale: f64,
    pub sampler: String,
    pub batch_size: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            prompt_template: "Trending NFT artwork: {trend}, {volume} searches".to_string(),
            style_qualifiers: vec![
                "vibrant colors".to_string(),
                "highly detailed".to_string(),
                "digital art".to_string(),
            ],
            negative_prompt: "blurry, low quality, text, watermark".to_string(),
            steps: 28,
            width: 768,
            height: 768,
            cfg_scale: 7.0,
            sampler: "Euler a".to_string(),
            batch_size: 1,
        }
    }
}

impl GenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    pub fn with_style_qualifiers<I, S>(mut self, qualifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.style_qualifiers = qualifiers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_negative_prompt(mut self, negative: impl Into<String>) -> Self {
        self.negative_prompt = negative.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_cfg_scale(mut self, cfg_scale: f64) -> Self {
        self.cfg_scale = cfg_scale;
        self
    }

    pub fn with_sampler(mut self, sampler: impl Into<String>) -> Self {
        self.sampler = sampler.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    fn apply_lookup<F>(mut self, lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup_var(lookup, "PROMPT_TEMPLATE") {
            self.prompt_template = v;
        }
        if let Some(v) = lookup_var(lookup, "STYLE_QUALIFIERS") {
            self.style_qualifiers = split_list(&v);
        }
        if let Some(v) = lookup_var(lookup, "NEGATIVE_PROMPT") {
            self.negative_prompt = v;
        }
        if let Some(v) = lookup_var(lookup, "SAMPLER") {
            self.sampler = v;
        }
        self.steps = parse_var(lookup, "STEPS")?.unwrap_or(self.steps);
        self.width = parse_var(lookup, "WIDTH")?.unwrap_or(self.width);
        self.height = parse_var(lookup, "HEIGHT")?.unwrap_or(self.height);
        self.cfg_scale = parse_var(lookup, "CFG_SCALE")?.unwrap_or(self.cfg_scale);
        self.batch_size = parse_var(lookup, "BATCH_SIZE")?.unwrap_or(self.batch_size);
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("steps", self.steps),
            ("width", self.width),
            ("height", self.height),
            ("batch_size", self.batch_size),
        ] {
            if value == 0 {
                return Err(TrendgenError::ConfigError(format!(
                    "{} must be a positive integer",
                    name
                )));
            }
        }
        if !(self.cfg_scale.is_finite() && self.cfg_scale > 0.0) {
            return Err(TrendgenError::ConfigError(
                "cfg_scale must be a positive number".into(),
            ));
        }
        if self.sampler.trim().is_empty() {
            return Err(TrendgenError::ConfigError("sampler must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub image_extension: String,
    pub timeout_seconds: u64,
    pub cooldown_seconds: f64,
    pub max_retries: u32,
    pub retry_delay_seconds: f64,
    /// Stop the batch after this many consecutive disk failures. `0` disables the guard.
    pub max_consecutive_io_failures: u32,
    pub manifest_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub log_level: LogLevel,
    /// Emit JSON lines instead of the colored console format.
    pub log_json: bool,
    pub generation: GenerationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: "http://localhost:7860".to_string(),
            input_path: PathBuf::from("inputs/trends.csv"),
            output_dir: PathBuf::from("outputs"),
            image_extension: "png".to_string(),
            timeout_seconds: 60,
            cooldown_seconds: 2.0,
            max_retries: 0,
            retry_delay_seconds: 5.0,
            max_consecutive_io_failures: 0,
            manifest_path: Some(PathBuf::from("outputs/manifest.csv")),
            log_file: Some(PathBuf::from("trendgen.log")),
            log_level: LogLevel::Info,
            log_json: false,
            generation: GenerationConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from defaults overlaid with `TRENDGEN_*` variables
    /// resolved through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(v) = lookup_var(&lookup, "BASE_URL") {
            config.base_url = v;
        }
        if let Some(v) = lookup_var(&lookup, "INPUT_PATH") {
            config.input_path = PathBuf::from(v);
        }
        if let Some(v) = lookup_var(&lookup, "OUTPUT_DIR") {
            // The manifest follows the output directory unless set explicitly.
            config.manifest_path = Some(PathBuf::from(&v).join("manifest.csv"));
            config.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup_var(&lookup, "IMAGE_EXTENSION") {
            config.image_extension = v;
        }
        config.timeout_seconds = parse_var(&lookup, "TIMEOUT_SECONDS")?.unwrap_or(config.timeout_seconds);
        config.cooldown_seconds =
            parse_var(&lookup, "COOLDOWN_SECONDS")?.unwrap_or(config.cooldown_seconds);
        config.max_retries = parse_var(&lookup, "MAX_RETRIES")?.unwrap_or(config.max_retries);
        config.retry_delay_seconds =
            parse_var(&lookup, "RETRY_DELAY_SECONDS")?.unwrap_or(config.retry_delay_seconds);
        config.max_consecutive_io_failures = parse_var(&lookup, "MAX_CONSECUTIVE_IO_FAILURES")?
            .unwrap_or(config.max_consecutive_io_failures);

        // An explicitly empty value disables the sink.
        if let Some(v) = lookup(&format!("{}MANIFEST_PATH", ENV_PREFIX)) {
            config.manifest_path = non_empty_path(&v);
        }
        if let Some(v) = lookup(&format!("{}LOG_FILE", ENV_PREFIX)) {
            config.log_file = non_empty_path(&v);
        }
        if let Some(v) = lookup_var(&lookup, "LOG_LEVEL") {
            config.log_level = v.parse()?;
        }
        config.log_json = parse_var(&lookup, "LOG_JSON")?.unwrap_or(config.log_json);

        config.generation = config.generation.apply_lookup(&lookup)?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_path = path.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_cooldown_seconds(mut self, seconds: f64) -> Self {
        self.cooldown_seconds = seconds;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, delay_seconds: f64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_seconds = delay_seconds;
        self
    }

    pub fn with_max_consecutive_io_failures(mut self, limit: u32) -> Self {
        self.max_consecutive_io_failures = limit;
        self
    }

    pub fn with_manifest(mut self, path: Option<PathBuf>) -> Self {
        self.manifest_path = path;
        self
    }

    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn cooldown(&self) -> Duration {
        seconds_to_duration(self.cooldown_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        seconds_to_duration(self.retry_delay_seconds)
    }

    pub fn txt2img_url(&self) -> String {
        sdapi::txt2img_url(&self.base_url)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(TrendgenError::ConfigError("base_url must not be empty".into()));
        }
        if self.timeout_seconds == 0 {
            return Err(TrendgenError::ConfigError(
                "timeout_seconds must be a positive integer".into(),
            ));
        }
        for (name, value) in [
            ("cooldown_seconds", self.cooldown_seconds),
            ("retry_delay_seconds", self.retry_delay_seconds),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(TrendgenError::ConfigError(format!(
                    "{} must be a non-negative number",
                    name
                )));
            }
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(TrendgenError::ConfigError(format!(
                    "{} is too large ({})",
                    name, value
                )));
            }
        }
        if self.image_extension.is_empty()
            || !self.image_extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(TrendgenError::ConfigError(format!(
                "invalid image extension '{}'",
                self.image_extension
            )));
        }
        self.generation.validate()
    }
}

fn lookup_var<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(&format!("{}{}", ENV_PREFIX, name))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup_var(lookup, name) {
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            TrendgenError::ConfigError(format!(
                "{}{} has invalid value '{}'",
                ENV_PREFIX, name, raw
            ))
        }),
        None => Ok(None),
    }
}

/// Saturates instead of panicking; `validate` rejects the out-of-range values.
fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(if seconds > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn non_empty_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}
