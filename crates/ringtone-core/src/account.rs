//! Account reward state.
//!
//! An account is created on first sign-in with a zero balance and is only
//! ever mutated through [`AccountPatch`], which keeps the derived `level` in
//! step with `points` and never clears the first-contribution flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::{level_for, WithdrawalPolicy};
use crate::AccountId;

/// A registered user's reward state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account id (from the auth backend).
    pub id: AccountId,

    /// Email captured at sign-in, if the token carried one.
    pub email: Option<String>,

    /// Spendable point balance. Never negative.
    pub points: i64,

    /// Derived level, `points / 500 + 1`.
    pub level: i32,

    /// Number of withdrawals ever requested.
    pub withdrawal_count: i32,

    /// Last payout destination used (UPI id, wallet address, ...).
    pub payout_destination: Option<String>,

    /// Whether the one-time first-contribution bonus has been paid.
    pub first_contribution_rewarded: bool,

    /// Optimistic concurrency counter, bumped on every update.
    pub version: i64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a fresh account with zero balance at level 1.
    #[must_use]
    pub fn new(id: AccountId, email: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            points: 0,
            level: 1,
            withdrawal_count: 0,
            payout_destination: None,
            first_contribution_rewarded: false,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Withdrawal rules that apply to this account right now.
    #[must_use]
    pub const fn withdrawal_policy(&self) -> WithdrawalPolicy {
        WithdrawalPolicy::for_history(self.withdrawal_count)
    }

    /// Apply a patch in place, bumping `version` and `updated_at`.
    pub fn apply(&mut self, patch: &AccountPatch) {
        if let Some(points) = patch.points {
            self.points = points.max(0);
            self.level = level_for(self.points);
        }
        if let Some(count) = patch.withdrawal_count {
            self.withdrawal_count = count;
        }
        if let Some(destination) = &patch.payout_destination {
            self.payout_destination = Some(destination.clone());
        }
        if patch.mark_first_contribution_rewarded {
            self.first_contribution_rewarded = true;
        }
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

/// A partial update to an [`Account`].
///
/// `level` is not patchable; it is recomputed whenever `points` changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPatch {
    /// New point balance.
    pub points: Option<i64>,
    /// New lifetime withdrawal count.
    pub withdrawal_count: Option<i32>,
    /// New payout destination.
    pub payout_destination: Option<String>,
    /// Set the first-contribution flag (it can never be cleared).
    pub mark_first_contribution_rewarded: bool,
}

impl AccountPatch {
    /// Patch that only sets the point balance.
    #[must_use]
    pub fn points(points: i64) -> Self {
        Self {
            points: Some(points),
            ..Self::default()
        }
    }

    /// Whether the patch would change nothing but the version.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_none()
            && self.withdrawal_count.is_none()
            && self.payout_destination.is_none()
            && !self.mark_first_contribution_rewarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_starts_at_level_one() {
        let account = Account::new(AccountId::generate(), None);
        assert_eq!(account.points, 0);
        assert_eq!(account.level, 1);
        assert_eq!(account.withdrawal_count, 0);
        assert!(!account.first_contribution_rewarded);
    }

    #[test]
    fn applying_points_recomputes_level_and_bumps_version() {
        let mut account = Account::new(AccountId::generate(), None);
        account.apply(&AccountPatch::points(1_020));
        assert_eq!(account.level, 3);
        assert_eq!(account.version, 1);
    }

    #[test]
    fn patch_never_drives_points_negative() {
        let mut account = Account::new(AccountId::generate(), None);
        account.apply(&AccountPatch::points(-5));
        assert_eq!(account.points, 0);
        assert_eq!(account.level, 1);
    }

    #[test]
    fn first_contribution_flag_is_sticky() {
        let mut account = Account::new(AccountId::generate(), None);
        account.apply(&AccountPatch {
            mark_first_contribution_rewarded: true,
            ..AccountPatch::default()
        });
        account.apply(&AccountPatch::points(10));
        assert!(account.first_contribution_rewarded);
    }

    #[test]
    fn default_patch_is_empty() {
        assert!(AccountPatch::default().is_empty());
        assert!(!AccountPatch::points(0).is_empty());
    }
}
