//! Account and reward handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ringtone_core::{Account, AccountId, Badge, POINTS_PER_LEVEL};

use super::withdrawals::WithdrawalResponse;
use super::{ok, Success};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Withdrawals shown on the profile.
const PROFILE_WITHDRAWAL_LIMIT: usize = 10;

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account id.
    pub account_id: String,
    /// Email, if known.
    pub email: Option<String>,
    /// Spendable points.
    pub points: i64,
    /// Current level.
    pub level: i32,
    /// Points still needed for the next level.
    pub points_to_next_level: i64,
    /// Lifetime withdrawal count.
    pub withdrawal_count: i32,
    /// Last payout destination used.
    pub payout_destination: Option<String>,
    /// Whether the first-contribution bonus was paid.
    pub first_contribution_rewarded: bool,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id.to_string(),
            email: account.email.clone(),
            points: account.points,
            level: account.level,
            points_to_next_level: POINTS_PER_LEVEL - account.points.rem_euclid(POINTS_PER_LEVEL),
            withdrawal_count: account.withdrawal_count,
            payout_destination: account.payout_destination.clone(),
            first_contribution_rewarded: account.first_contribution_rewarded,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Badge response.
#[derive(Debug, Serialize)]
pub struct BadgeResponse {
    /// Badge name.
    pub name: String,
    /// What it was awarded for.
    pub description: String,
    /// Icon reference.
    pub icon: String,
}

impl From<&Badge> for BadgeResponse {
    fn from(badge: &Badge) -> Self {
        Self {
            name: badge.name.clone(),
            description: badge.description.clone(),
            icon: badge.icon.clone(),
        }
    }
}

fn badge_list(badges: &[Badge]) -> Vec<BadgeResponse> {
    badges.iter().map(BadgeResponse::from).collect()
}

/// Wrapped account payload.
#[derive(Debug, Serialize)]
pub struct AccountPayload {
    /// The account.
    pub account: AccountResponse,
}

/// Profile payload.
#[derive(Debug, Serialize)]
pub struct ProfilePayload {
    /// The account.
    pub account: AccountResponse,
    /// Awarded badges.
    pub badges: Vec<BadgeResponse>,
    /// Recent withdrawal requests, newest first.
    pub withdrawals: Vec<WithdrawalResponse>,
}

/// Reconciliation payload.
#[derive(Debug, Serialize)]
pub struct SyncPayload {
    /// The account after reconciliation.
    pub account: AccountResponse,
    /// Whether points or level were corrected.
    pub corrected: bool,
    /// Badges awarded by this refresh.
    pub new_badges: Vec<BadgeResponse>,
}

/// Bonus payload.
#[derive(Debug, Serialize)]
pub struct BonusPayload {
    /// Whether this call paid the bonus.
    pub bonus_given: bool,
    /// Balance after the call.
    pub points: i64,
}

/// Create account request.
#[derive(Debug, Default, Deserialize)]
pub struct CreateAccountRequest {
    /// Email override; defaults to the token's email claim.
    #[serde(default)]
    pub email: Option<String>,
}

/// Register the caller's account (idempotent).
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Json<Success<AccountPayload>>, ApiError> {
    let email = body.email.or(auth.email);
    let account = state
        .ledger
        .ensure_account(&auth.account_id, email.as_deref())
        .await?;

    tracing::info!(account_id = %auth.account_id, "Account registered");

    Ok(ok(AccountPayload {
        account: AccountResponse::from(&account),
    }))
}

/// Get the caller's profile: account, badges and recent withdrawals.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Success<ProfilePayload>>, ApiError> {
    let account = state.ledger.account(&auth.account_id).await?;
    let badges = state.ledger.badges_for(&auth.account_id).await?;
    let withdrawals = state
        .ledger
        .withdrawal_history(&auth.account_id, PROFILE_WITHDRAWAL_LIMIT)
        .await?;

    Ok(ok(ProfilePayload {
        account: AccountResponse::from(&account),
        badges: badge_list(&badges),
        withdrawals: withdrawals.iter().map(WithdrawalResponse::from).collect(),
    }))
}

/// Profile refresh: reconcile points with approved uploads and sync badges.
pub async fn sync_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Success<SyncPayload>>, ApiError> {
    let outcome = state
        .ledger
        .sync_gamification_state(&auth.account_id)
        .await?;

    Ok(ok(SyncPayload {
        account: AccountResponse::from(&outcome.account),
        corrected: outcome.corrected,
        new_badges: badge_list(&outcome.new_badges),
    }))
}

/// Pay the first-contribution bonus.
pub async fn grant_first_contribution_bonus(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(account_id): Path<String>,
) -> Result<Json<Success<BonusPayload>>, ApiError> {
    let account_id = parse_account_id(&account_id)?;
    let outcome = state
        .ledger
        .grant_first_contribution_bonus(&auth.account_id, &account_id)
        .await?;

    Ok(ok(BonusPayload {
        bonus_given: outcome.bonus_given,
        points: outcome.points,
    }))
}

pub(crate) fn parse_account_id(raw: &str) -> Result<AccountId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("Invalid account ID".into()))
}
