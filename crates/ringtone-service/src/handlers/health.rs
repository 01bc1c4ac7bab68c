//! Health check handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::{ok, Success};
use crate::cache::CacheStats;
use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Catalog cache counters.
    pub cache: CacheStats,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Success<HealthResponse>> {
    ok(HealthResponse {
        status: "ok".to_string(),
        service: "ringtone-rewards".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache: state.catalog.cache().stats(),
    })
}
