//! HTTP API Server Module
//!
//! Read-only JSON API over the live buckets and the stored rain.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use server::HttpServer;
