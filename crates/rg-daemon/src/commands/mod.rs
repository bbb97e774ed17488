//! CLI subcommand implementations.

pub mod archive;
pub mod run;
pub mod status;

use anyhow::{Context, Result};
use rg_db::Database;

use crate::Config;

/// Opens the configured database, ensuring the parent directory exists.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}
