use clap::Parser;
use std::fs;
use std::sync::Arc;
use trendgen::{
    cli::CliOptions,
    logger::{self, LoggerConfig},
    BatchDriver, Config, ImageClient, LogReporter, Manifest, SourceReader, TrendgenError,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let cli = CliOptions::parse();
    let config = cli.apply(Config::from_env()?);

    logger::init_with_config(LoggerConfig::from_config(&config))
        .map_err(TrendgenError::LoggerError)?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::debug!("No .env file found, using process environment");
    }

    config.validate()?;
    logger::log_config_info(&config);

    // Input must exist and have a readable header before anything else is touched.
    let records = match SourceReader::open(&config.input_path).and_then(SourceReader::records) {
        Ok(records) => records,
        Err(err) => {
            log::error!("💀 {}", err);
            return Err(err.into());
        }
    };

    if !config.output_dir.exists() {
        log::info!("📁 Creating output directory {}", config.output_dir.display());
    }
    fs::create_dir_all(&config.output_dir)?;

    let client = ImageClient::from_config(&config)?;
    let mut driver = BatchDriver::new(
        &config,
        Arc::new(client),
        Arc::new(LogReporter::default()),
    );

    if let Some(path) = &config.manifest_path {
        match Manifest::open(path) {
            Ok(manifest) => driver = driver.with_manifest(manifest),
            Err(err) => log::warn!("⚠️  Manifest disabled, cannot open {}: {}", path.display(), err),
        }
    }

    let outcome = {
        let _timer = logger::timer("batch");
        driver.run(records).await
    };

    log::info!(
        "📊 Summary: attempted={} succeeded={} skipped={} failed={}",
        outcome.attempted,
        outcome.succeeded,
        outcome.skipped,
        outcome.failed
    );
    for failure in &outcome.failures {
        log::warn!(
            "   row {} '{}': {} ({})",
            failure.row,
            failure.trend,
            failure.kind,
            failure.detail
        );
    }
    if outcome.aborted {
        log::error!("Batch stopped early after repeated disk failures");
    }

    Ok(())
}
