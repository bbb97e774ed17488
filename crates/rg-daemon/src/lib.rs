//! Rain gauge daemon library.
//!
//! This crate provides the CLI, configuration and HTTP API for `rgd`.

mod cli;
pub mod commands;
mod config;
pub mod http;

pub use cli::{Cli, Commands};
pub use config::{Config, ConfigOverrides, Settings};
