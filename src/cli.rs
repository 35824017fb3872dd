//! CLI parser
use crate::config::Config;
use crate::logger::LogLevel;
use clap::Parser;
use std::path::PathBuf;

/// Generate images for every trend in a CSV file via a local txt2img endpoint.
///
/// Flags override `TRENDGEN_*` environment variables, which override the
/// built-in defaults.
#[derive(Parser, Debug, Default)]
#[command(name = "trendgen", version, about)]
pub struct CliOptions {
    /// CSV file with a `Trends` column (default `inputs/trends.csv`)
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Directory for generated images, created if missing (default `outputs`)
    #[arg(long, short)]
    pub output_dir: Option<PathBuf>,

    /// Base URL of the generation service (default `http://localhost:7860`)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Pause between records in seconds
    #[arg(long)]
    pub cooldown: Option<f64>,

    /// Retries for transport failures (default 0)
    #[arg(long)]
    pub retries: Option<u32>,

    #[arg(long)]
    pub steps: Option<u32>,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    #[arg(long)]
    pub cfg_scale: Option<f64>,

    #[arg(long)]
    pub sampler: Option<String>,

    #[arg(long)]
    pub batch_size: Option<u32>,

    /// Prompt template with `{trend}` and `{volume}` placeholders
    #[arg(long)]
    pub prompt_template: Option<String>,

    #[arg(long)]
    pub negative_prompt: Option<String>,

    /// Skip writing the CSV manifest
    #[arg(long)]
    pub no_manifest: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Log JSON lines instead of colored text
    #[arg(long)]
    pub json_logs: bool,
}

impl CliOptions {
    pub fn apply(self, mut config: Config) -> Config {
        if let Some(input) = self.input {
            config.input_path = input;
        }
        if let Some(dir) = self.output_dir {
            if config.manifest_path == Some(config.output_dir.join("manifest.csv")) {
                config.manifest_path = Some(dir.join("manifest.csv"));
            }
            config.output_dir = dir;
        }
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(cooldown) = self.cooldown {
            config.cooldown_seconds = cooldown;
        }
        if let Some(retries) = self.retries {
            config.max_retries = retries;
        }

        let generation = &mut config.generation;
        if let Some(steps) = self.steps {
            generation.steps = steps;
        }
        if let Some(width) = self.width {
            generation.width = width;
        }
        if let Some(height) = self.height {
            generation.height = height;
        }
        if let Some(cfg_scale) = self.cfg_scale {
            generation.cfg_scale = cfg_scale;
        }
        if let Some(sampler) = self.sampler {
            generation.sampler = sampler;
        }
        if let Some(batch_size) = self.batch_size {
            generation.batch_size = batch_size;
        }
        if let Some(template) = self.prompt_template {
            generation.prompt_template = template;
        }
        if let Some(negative) = self.negative_prompt {
            generation.negative_prompt = negative;
        }

        if self.no_manifest {
            config.manifest_path = None;
        }
        if self.debug {
            config.log_level = LogLevel::Debug;
        }
        if self.json_logs {
            config.log_json = true;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = CliOptions::parse_from([
            "trendgen",
            "--output-dir",
            "renders",
            "--cooldown",
            "0",
            "--width",
            "512",
            "--sampler",
            "DPM++ 2M Karras",
            "--debug",
            "--json-logs",
        ]);
        let config = cli.apply(Config::default());

        assert_eq!(config.output_dir, PathBuf::from("renders"));
        assert_eq!(config.manifest_path, Some(PathBuf::from("renders/manifest.csv")));
        assert_eq!(config.cooldown_seconds, 0.0);
        assert_eq!(config.generation.width, 512);
        assert_eq!(config.generation.height, 768);
        assert_eq!(config.generation.sampler, "DPM++ 2M Karras");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(config.log_json);
    }

    #[test]
    fn test_no_flags_keeps_config() {
        let config = CliOptions::parse_from(["trendgen"]).apply(Config::default());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_no_manifest() {
        let config = CliOptions::parse_from(["trendgen", "--no-manifest"]).apply(Config::default());
        assert_eq!(config.manifest_path, None);
    }
}
