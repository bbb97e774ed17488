//! HTTP API Response Types
//!
//! JSON-serializable types for the HTTP API.

use std::collections::BTreeMap;

use rg_core::StatsSnapshot;
use serde::{Deserialize, Serialize};

/// Most recent stored minute with rain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastRainResponse {
    /// Minute start (ISO 8601), or null when nothing has been recorded
    pub timestamp: Option<String>,
    /// Tips in that minute
    pub amount: i64,
    /// Divider the row was recorded with, or the configured one if none
    pub divider: i64,
}

/// Summed rain for a calendar window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveResponse {
    pub period: String,
    pub divider: i64,
    /// `DDHH` keys for month windows, `DDD` (day-of-year) for the year window
    pub data: BTreeMap<String, i64>,
}

/// Collector health and counters
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub started_at: String,
    pub uptime_seconds: i64,
    pub divider: i64,
    pub current_minute: usize,
    pub current_hour: usize,
    pub collector: StatsSnapshot,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }
}
