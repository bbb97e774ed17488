//! HTTP API Request Handlers
//!
//! Bucket views come straight from the collector's shared state. Historical
//! queries run on the read connection in a blocking task. A failed query is
//! logged and answered with an empty result, never an error status.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use rg_core::{ArchivePeriod, RainSummary, RainView, clock};
use rg_db::{Database, DbError};
use tracing::warn;

use super::types::{
    ArchiveResponse, ErrorResponse, HealthResponse, LastRainResponse, StatusResponse,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub view: RainView,
    /// Read connection, separate from the collector's write connection.
    pub db: Arc<Mutex<Database>>,
}

impl AppState {
    pub fn new(view: RainView, db: Database) -> Self {
        Self {
            view,
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Runs a read query off the async runtime.
    async fn query<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, DbError> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let db = db.lock().unwrap_or_else(PoisonError::into_inner);
            f(&db)
        })
        .await
        .context("query task failed")?
        .context("query failed")
    }
}

/// Current minute, divider and the last hour and day of buckets
pub async fn root(State(state): State<AppState>) -> Json<RainSummary> {
    Json(state.view.summary())
}

/// Most recent stored minute with rain
pub async fn last_rain(State(state): State<AppState>) -> Json<LastRainResponse> {
    let last = state
        .query(|db| db.last_rain())
        .await
        .unwrap_or_else(|err| {
            warn!(error = %format!("{err:#}"), "last rain query failed");
            None
        });

    Json(match last {
        Some(record) => LastRainResponse {
            timestamp: Some(clock::iso_timestamp(record.timestamp)),
            amount: record.amount,
            divider: record.divider,
        },
        None => LastRainResponse {
            timestamp: None,
            amount: 0,
            divider: state.view.divider(),
        },
    })
}

/// Summed rain for `thismonth`, `lastmonth` or `thisyear`
pub async fn archive(
    State(state): State<AppState>,
    Path(period): Path<String>,
) -> Result<Json<ArchiveResponse>, (StatusCode, Json<ErrorResponse>)> {
    let period: ArchivePeriod = period.parse().map_err(|err: rg_core::ValidationError| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found(err.to_string())),
        )
    })?;

    let data = match period.window(Utc::now()) {
        Some(window) => state
            .query(move |db| db.archive(&window))
            .await
            .unwrap_or_else(|err| {
                warn!(error = %format!("{err:#}"), %period, "archive query failed");
                BTreeMap::new()
            }),
        None => BTreeMap::new(),
    };

    Ok(Json(ArchiveResponse {
        period: period.to_string(),
        divider: state.view.divider(),
        data,
    }))
}

/// Collector counters and uptime
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let view = &state.view;
    let started_at = view.started_at();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: started_at.to_rfc3339(),
        uptime_seconds: (Utc::now() - started_at).num_seconds(),
        divider: view.divider(),
        current_minute: view.current_minute(),
        current_hour: view.current_hour(),
        collector: view.stats(),
    })
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
