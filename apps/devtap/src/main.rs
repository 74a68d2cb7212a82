//! devtap entry point.

mod app;
mod cli;
mod config;

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<ExitCode> {
    let cli = cli::Cli::parse();

    // Diagnostics go to stderr; stdout carries the console stream.
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting devtap");

    let config = config::Config::load(cli.config.as_deref())?.merge_cli(&cli);
    let mut settings = config.into_settings(cli.ws_url.clone(), cli.command.clone())?;
    if std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal() {
        settings.pipeline.colors = false;
    }

    let rt = tokio::runtime::Runtime::new()?;
    let code = rt.block_on(app::run(settings))?;

    tracing::info!("devtap shut down cleanly");
    Ok(code.map_or(ExitCode::SUCCESS, |c| ExitCode::from(c.clamp(0, 255) as u8)))
}
