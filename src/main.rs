//! # nsx-dfw
//!
//! Command-line entry point. See [`cli`] for the available commands.

mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::debug;

use nsx_dfw::config::{DfwConfig, LogFormat};
use nsx_dfw::constants::DEFAULT_LOG_FILTER;
use nsx_dfw::observability::metrics;

use cli::{Cli, Session};

#[tokio::main]
async fn main() -> Result<()> {
    // Must happen before any rustls client is built
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|provider| anyhow!("Failed to install rustls crypto provider: {provider:?}"))?;

    let cli = Cli::parse();

    let mut config = DfwConfig::from_env().context("Failed to load configuration")?;
    if let Some(name) = cli.section_name.clone() {
        config.section_name = name;
    }

    init_tracing(config.log_format);
    metrics::register_metrics()?;
    debug!("Configuration: {:?}", config);

    let session = Session::new(config, cli.dry_run)?;
    let result = cli::run(cli.command, &session).await;

    if cli.metrics {
        eprintln!("{}", metrics::gather_text()?);
    }
    result
}

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}
