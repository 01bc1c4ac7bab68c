//! Withdrawal request records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RewardsError;
use crate::{AccountId, WithdrawalId};

/// An immutable payout ask, created after the amount was debited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Time-ordered id.
    pub id: WithdrawalId,
    /// Owning account.
    pub account_id: AccountId,
    /// Effective (debited) amount in points.
    pub amount: i64,
    /// Where the payout should go.
    pub payout_destination: String,
    /// Moderation status.
    pub status: WithdrawalStatus,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request reached a terminal status.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl WithdrawalRequest {
    /// Create a new pending request.
    #[must_use]
    pub fn pending(account_id: AccountId, amount: i64, payout_destination: String) -> Self {
        Self {
            id: WithdrawalId::generate(),
            account_id,
            amount,
            payout_destination,
            status: WithdrawalStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }
}

/// Status of a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    /// Awaiting moderation.
    Pending,
    /// Paid out.
    Fulfilled,
    /// Declined by a moderator.
    Rejected,
}

impl WithdrawalStatus {
    /// Whether no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Fulfilled | Self::Rejected)
    }

    /// Check that `self -> next` is a legal transition.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless moving from `Pending` to a terminal status.
    pub fn transition_to(self, next: Self) -> Result<Self, RewardsError> {
        if self == Self::Pending && next.is_terminal() {
            Ok(next)
        } else {
            Err(RewardsError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    /// Stable lowercase name, as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalStatus {
    type Err = RewardsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "fulfilled" => Ok(Self::Fulfilled),
            "rejected" => Ok(Self::Rejected),
            other => Err(RewardsError::ValidationFailed(format!(
                "unknown withdrawal status: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_request_is_pending() {
        let request = WithdrawalRequest::pending(AccountId::generate(), 15, "upi@bank".into());
        assert_eq!(request.status, WithdrawalStatus::Pending);
        assert!(request.resolved_at.is_none());
    }

    #[test]
    fn pending_moves_to_either_terminal_status() {
        assert_eq!(
            WithdrawalStatus::Pending
                .transition_to(WithdrawalStatus::Fulfilled)
                .unwrap(),
            WithdrawalStatus::Fulfilled
        );
        assert!(WithdrawalStatus::Pending
            .transition_to(WithdrawalStatus::Rejected)
            .is_ok());
    }

    #[test]
    fn terminal_statuses_are_final() {
        let err = WithdrawalStatus::Fulfilled
            .transition_to(WithdrawalStatus::Rejected)
            .unwrap_err();
        assert!(matches!(err, RewardsError::InvalidTransition { .. }));
        assert!(WithdrawalStatus::Pending
            .transition_to(WithdrawalStatus::Pending)
            .is_err());
    }

    #[test]
    fn status_round_trips_through_its_name() {
        for status in [
            WithdrawalStatus::Pending,
            WithdrawalStatus::Fulfilled,
            WithdrawalStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<WithdrawalStatus>().unwrap(), status);
        }
    }
}
