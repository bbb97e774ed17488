use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rg_daemon::commands::{archive, run, status};
use rg_daemon::{Cli, Commands, Config};

/// Initialize tracing, writing to `log_file` instead of stdout when set.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stdout)
            .try_init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_from(cli.config.as_deref(), &cli.overrides())
        .context("failed to load configuration")?;
    init_tracing(cli.verbose, config.log_file.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    match &cli.command {
        None | Some(Commands::Run) => run::run(&config)?,
        Some(Commands::Status) => status::run(&mut io::stdout().lock(), &config)?,
        Some(Commands::Archive { period, json }) => {
            archive::run(&mut io::stdout().lock(), &config, *period, *json)?;
        }
    }

    Ok(())
}
