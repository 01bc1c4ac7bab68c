//! Contribution events from the moderation pipeline.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::accounts::{parse_account_id, AccountResponse, BadgeResponse};
use super::{ok, Success};
use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// An upload was approved.
#[derive(Debug, Deserialize)]
pub struct ContributionApproved {
    /// Uploader account id.
    pub account_id: String,
}

/// Credit payload.
#[derive(Debug, Serialize)]
pub struct ContributionPayload {
    /// The account after the credit.
    pub account: AccountResponse,
    /// Badges unlocked by this approval.
    pub new_badges: Vec<BadgeResponse>,
}

/// Credit the uploader of an approved contribution.
pub async fn contribution_approved(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Json(body): Json<ContributionApproved>,
) -> Result<Json<Success<ContributionPayload>>, ApiError> {
    let account_id = parse_account_id(&body.account_id)?;
    let outcome = state
        .ledger
        .credit_approved_contribution(&account_id)
        .await?;

    tracing::info!(
        service = %service.service_name,
        account_id = %account_id,
        new_badges = outcome.new_badges.len(),
        "Contribution approval processed"
    );

    Ok(ok(ContributionPayload {
        account: AccountResponse::from(&outcome.account),
        new_badges: outcome.new_badges.iter().map(BadgeResponse::from).collect(),
    }))
}
