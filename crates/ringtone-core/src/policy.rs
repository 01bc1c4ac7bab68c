//! Reward policy: point values, levels and withdrawal thresholds.

use crate::error::{Result, RewardsError};

// ============================================================================
// Constants
// ============================================================================

/// One-time bonus for an account's first contribution.
pub const FIRST_CONTRIBUTION_BONUS: i64 = 15;

/// Points earned per approved contribution.
pub const POINTS_PER_CONTRIBUTION: i64 = 50;

/// Points needed to advance one level.
pub const POINTS_PER_LEVEL: i64 = 500;

/// Minimum (and fixed payout) for an account's first withdrawal.
pub const FIRST_WITHDRAWAL_AMOUNT: i64 = 15;

/// Minimum withdrawal once an account has withdrawn before.
pub const REPEAT_WITHDRAWAL_MINIMUM: i64 = 200;

/// Guarded account updates attempted before giving up with `Contention`.
pub const MAX_UPDATE_ATTEMPTS: usize = 8;

/// Level for a point balance: `points / 500 + 1`.
///
/// Negative balances never occur; they are clamped to level 1.
#[must_use]
pub fn level_for(points: i64) -> i32 {
    let level = points.max(0) / POINTS_PER_LEVEL + 1;
    i32::try_from(level).unwrap_or(i32::MAX)
}

/// Points an account should hold given its approved contribution count.
#[must_use]
pub fn points_for_contributions(approved: i64) -> i64 {
    approved.max(0).saturating_mul(POINTS_PER_CONTRIBUTION)
}

/// Withdrawal rule set resolved from an account's withdrawal history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalPolicy {
    /// Smallest amount that may be requested.
    pub minimum: i64,
    /// Fixed payout overriding the requested amount, if any.
    pub fixed_amount: Option<i64>,
}

impl WithdrawalPolicy {
    /// Resolve the policy for an account with `withdrawal_count` prior payouts.
    #[must_use]
    pub const fn for_history(withdrawal_count: i32) -> Self {
        if withdrawal_count == 0 {
            Self {
                minimum: FIRST_WITHDRAWAL_AMOUNT,
                fixed_amount: Some(FIRST_WITHDRAWAL_AMOUNT),
            }
        } else {
            Self {
                minimum: REPEAT_WITHDRAWAL_MINIMUM,
                fixed_amount: None,
            }
        }
    }

    /// Validate a request against this policy and a balance.
    ///
    /// Returns the effective amount to debit.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` when the request is below the minimum or the
    /// balance cannot cover the effective amount. Both messages carry the
    /// numbers the user needs to correct the request.
    pub fn effective_amount(&self, requested: i64, balance: i64) -> Result<i64> {
        if requested < self.minimum {
            return Err(RewardsError::ValidationFailed(format!(
                "Minimum withdrawal is {} points",
                self.minimum
            )));
        }

        let effective = self.fixed_amount.unwrap_or(requested);
        if balance < effective {
            return Err(RewardsError::ValidationFailed(format!(
                "Insufficient points: you need {effective} points but have {balance}"
            )));
        }

        Ok(effective)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_steps_every_500_points() {
        assert_eq!(level_for(0), 1);
        assert_eq!(level_for(499), 1);
        assert_eq!(level_for(500), 2);
        assert_eq!(level_for(1_250), 3);
        assert_eq!(level_for(-20), 1);
    }

    #[test]
    fn first_withdrawal_is_capped_at_fixed_amount() {
        let policy = WithdrawalPolicy::for_history(0);
        assert_eq!(policy.effective_amount(500, 1_000).unwrap(), 15);
        assert_eq!(policy.effective_amount(15, 15).unwrap(), 15);
    }

    #[test]
    fn first_withdrawal_below_minimum_names_minimum() {
        let err = WithdrawalPolicy::for_history(0)
            .effective_amount(10, 100)
            .unwrap_err();
        assert!(err.to_string().contains("15"));
    }

    #[test]
    fn repeat_withdrawal_below_minimum_names_200() {
        let err = WithdrawalPolicy::for_history(1)
            .effective_amount(150, 180)
            .unwrap_err();
        assert!(matches!(err, RewardsError::ValidationFailed(_)));
        assert!(err.to_string().contains("200"));
    }

    #[test]
    fn repeat_withdrawal_shortfall_names_required_amount() {
        let err = WithdrawalPolicy::for_history(3)
            .effective_amount(450, 300)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("450"));
        assert!(message.contains("300"));
    }

    #[test]
    fn repeat_withdrawal_honours_requested_amount() {
        let policy = WithdrawalPolicy::for_history(2);
        assert_eq!(policy.effective_amount(200, 250).unwrap(), 200);
    }
}
