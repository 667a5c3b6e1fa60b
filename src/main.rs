use anyhow::Context;
use clap::Parser;
use cvecat::cli::{log_level, run_cli, Cli};
use cvecat::settings::Settings;
use tracing::{debug, error};
use tracing_subscriber::fmt;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.apply(Settings::from_env().context("reading CVECAT_* environment")?);

    // Initialize logging
    fmt()
        .with_max_level(log_level(settings.verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    debug!("Starting cvecat");

    if let Err(e) = run_cli(cli, settings) {
        error!("Application error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
