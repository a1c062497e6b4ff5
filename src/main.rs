//! mscz-recover - carve MuseScore .mscz files out of raw disk bytes

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mscz_recover::cli::{self, Cli};
use mscz_recover::config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(cli::log_filter(
            std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
            cli.log_level(&config),
        )?)
        .init();

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping after the current chunk");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let format = cli.output_format;
    let scan_cancel = Arc::clone(&cancel);
    let report = tokio::task::spawn_blocking(move || {
        cli::recover::run_recovery(&cli, &config, &scan_cancel)
    })
    .await
    .context("Scan task panicked")??;

    cli::recover::print_report(&report, format)?;

    Ok(())
}
