//! Payout desk handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ringtone_core::{WithdrawalId, WithdrawalStatus};

use super::withdrawals::WithdrawalResponse;
use super::{ok, Success};
use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_PENDING_LIMIT: usize = 50;
const MAX_PENDING_LIMIT: usize = 500;

/// Pending queue query.
#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    /// Page size (default 50, at most 500).
    pub limit: Option<usize>,
}

/// Resolution body.
#[derive(Debug, Deserialize)]
pub struct ResolveBody {
    /// `fulfilled` or `rejected`.
    pub status: WithdrawalStatus,
}

/// Pending queue payload.
#[derive(Debug, Serialize)]
pub struct PendingPayload {
    /// Pending requests, oldest first.
    pub withdrawals: Vec<WithdrawalResponse>,
}

/// Resolution payload.
#[derive(Debug, Serialize)]
pub struct ResolvedPayload {
    /// The resolved request.
    pub withdrawal: WithdrawalResponse,
}

/// List pending withdrawals.
pub async fn list_pending_withdrawals(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Success<PendingPayload>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PENDING_LIMIT)
        .clamp(1, MAX_PENDING_LIMIT);
    let pending = state.ledger.pending_withdrawals(limit).await?;

    Ok(ok(PendingPayload {
        withdrawals: pending.iter().map(WithdrawalResponse::from).collect(),
    }))
}

/// Mark a withdrawal fulfilled or rejected.
pub async fn resolve_withdrawal(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(withdrawal_id): Path<String>,
    Json(body): Json<ResolveBody>,
) -> Result<Json<Success<ResolvedPayload>>, ApiError> {
    let withdrawal_id: WithdrawalId = withdrawal_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid withdrawal ID".into()))?;

    let resolved = state
        .ledger
        .resolve_withdrawal(&withdrawal_id, body.status)
        .await?;

    tracing::info!(
        admin_id = %admin.admin_id,
        withdrawal_id = %withdrawal_id,
        status = %resolved.status,
        "Withdrawal resolved by admin"
    );

    Ok(ok(ResolvedPayload {
        withdrawal: WithdrawalResponse::from(&resolved),
    }))
}
