//! Withdrawal handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ringtone_core::WithdrawalRequest;

use super::accounts::parse_account_id;
use super::{ok, Success};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Withdrawal request response.
#[derive(Debug, Serialize)]
pub struct WithdrawalResponse {
    /// Request id.
    pub id: String,
    /// Requesting account.
    pub account_id: String,
    /// Effective (debited) amount.
    pub amount: i64,
    /// Payout destination.
    pub payout_destination: String,
    /// `pending`, `fulfilled` or `rejected`.
    pub status: String,
    /// When the request was made.
    pub created_at: String,
    /// When it was resolved, if it has been.
    pub resolved_at: Option<String>,
}

impl From<&WithdrawalRequest> for WithdrawalResponse {
    fn from(request: &WithdrawalRequest) -> Self {
        Self {
            id: request.id.to_string(),
            account_id: request.account_id.to_string(),
            amount: request.amount,
            payout_destination: request.payout_destination.clone(),
            status: request.status.to_string(),
            created_at: request.created_at.to_rfc3339(),
            resolved_at: request.resolved_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Withdrawal request body.
#[derive(Debug, Deserialize)]
pub struct WithdrawalBody {
    /// Requested amount in points.
    pub amount: i64,
    /// UPI id or other payout address.
    pub payout_destination: String,
}

/// Accepted withdrawal payload.
#[derive(Debug, Serialize)]
pub struct WithdrawalPayload {
    /// The recorded request.
    pub withdrawal: WithdrawalResponse,
    /// Balance after the debit.
    pub remaining_points: i64,
}

/// Request a withdrawal.
pub async fn request_withdrawal(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(account_id): Path<String>,
    Json(body): Json<WithdrawalBody>,
) -> Result<Json<Success<WithdrawalPayload>>, ApiError> {
    let account_id = parse_account_id(&account_id)?;
    let outcome = state
        .ledger
        .request_withdrawal(
            &auth.account_id,
            &account_id,
            body.amount,
            &body.payout_destination,
        )
        .await?;

    Ok(ok(WithdrawalPayload {
        withdrawal: WithdrawalResponse::from(&outcome.withdrawal),
        remaining_points: outcome.remaining_points,
    }))
}
