use std::io;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing::debug;

use decl_cli::cli::Cli;
use decl_cli::config::AppConfig;
use decl_cli::{app, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_default_logging();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load settings")?;
    config.apply_overrides(cli.overrides());

    logging::apply_configured_level(&config.logging.level)?;
    if let Some(path) = &config.logging.file {
        logging::enable_file_logging(path)?;
    }
    if cli.quiet {
        logging::set_console_enabled(false)?;
    }
    debug!(?config, "settings resolved");

    let mut service = app::open_service(&config).await?;
    let today = Local::now().date_naive();

    app::run(cli.command, &mut service, today, &mut io::stdout()).await
}
