//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rg_core::ArchivePeriod;

use crate::config::ConfigOverrides;

/// RG-11 rain daemon.
///
/// Keeps track of the wetness: samples the rain gauge, stores every minute
/// with rain and serves the last hour and day over HTTP.
#[derive(Debug, Parser)]
#[command(name = "rgd", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log to file instead of stdout.
    #[arg(long, global = true, value_name = "FILE")]
    pub logfile: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, global = true, value_name = "ADDRESS")]
    pub listen: Option<String>,

    /// Port to listen on.
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Size of the bucket (0 = 0.01", 1 = 0.001", 2 = 0.0001").
    #[arg(long, global = true, value_name = "BUCKET")]
    pub bucketsize: Option<u8>,

    /// Where to store rain data.
    #[arg(long, global = true, value_name = "DATABASE")]
    pub database: Option<PathBuf>,

    /// Sensor line the gauge is wired to (0-7).
    #[arg(long, global = true)]
    pub line: Option<u8>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sample the gauge and serve the HTTP API (the default).
    Run,

    /// Show the database and the last recorded rain.
    Status,

    /// Print stored rain for a calendar window.
    Archive {
        /// One of `thismonth`, `lastmonth` or `thisyear`.
        period: ArchivePeriod,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Command-line values that take precedence over config files and env.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            database_path: self.database.clone(),
            log_file: self.logfile.clone(),
            listen: self.listen.clone(),
            port: self.port,
            bucket_size: self.bucketsize,
            sensor_line: self.line,
        }
    }
}
