use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use crawldash_app::platform::{self, config, logging};
use crawldash_engine::{EngineHandle, MemoryApi};
use dash_logging::{dash_info, dash_warn};

#[derive(Debug, Parser)]
#[command(name = "crawldash", author, version, about = "Terminal dashboard for the crawl service")]
struct Cli {
    /// Configuration file (RON).
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// API prefix, overrides the configuration file.
    #[arg(long)]
    base_url: Option<String>,

    /// Use an in-process backend seeded with sample jobs.
    #[arg(long)]
    demo: bool,

    /// Write the effective configuration to `--config` and exit.
    #[arg(long)]
    write_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut settings, problem) = match config::load(&cli.config) {
        Ok(settings) => (settings, None),
        Err(err) => (config::AppConfig::default(), Some(err)),
    };
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }

    if cli.write_config {
        config::save(&cli.config, &settings)
            .with_context(|| format!("writing {:?}", cli.config))?;
        println!("Wrote {:?}", cli.config);
        return Ok(());
    }

    logging::initialize(settings.log_destination, settings.level_filter());
    if let Some(err) = problem {
        dash_warn!("{}; using defaults", err);
    }

    let engine = if cli.demo {
        dash_info!("Starting in demo mode");
        EngineHandle::with_api(Arc::new(MemoryApi::demo()))
    } else {
        dash_info!("Using API at {}", settings.base_url);
        EngineHandle::new(settings.api_settings()).context("creating API client")?
    };

    platform::run_app(engine, settings.page_size());
    Ok(())
}
