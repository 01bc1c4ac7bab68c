//! Public catalog handlers (served through the read-through cache).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;

use ringtone_core::{ListingFilter, Ringtone};

use super::{ok, Success};
use crate::error::ApiError;
use crate::state::AppState;

/// Listing payload.
#[derive(Debug, Serialize)]
pub struct ListingPayload {
    /// Matching ringtones.
    pub ringtones: Vec<Ringtone>,
}

/// Single ringtone payload.
#[derive(Debug, Serialize)]
pub struct RingtonePayload {
    /// The ringtone.
    pub ringtone: Ringtone,
}

/// List approved ringtones (`?sort=&category=&limit=&offset=`).
pub async fn list_ringtones(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ListingFilter>,
) -> Result<Json<Success<ListingPayload>>, ApiError> {
    let ringtones = state.catalog.listing(&filter).await?;
    Ok(ok(ListingPayload { ringtones }))
}

/// Get an approved ringtone by slug.
pub async fn get_ringtone(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Success<RingtonePayload>>, ApiError> {
    let ringtone = state.catalog.by_slug(&slug).await?;
    Ok(ok(RingtonePayload { ringtone }))
}
