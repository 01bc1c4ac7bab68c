//! Core types for the ringtone rewards ledger.
//!
//! This crate holds the domain model shared by the store and service crates:
//!
//! - **Identifiers**: `AccountId`, `BadgeId`, `RingtoneId`, `WithdrawalId`
//! - **Accounts**: `Account`, `AccountPatch`
//! - **Withdrawals**: `WithdrawalRequest`, `WithdrawalStatus`
//! - **Badges**: `Badge`, `BadgeCondition`, `AwardRecord`
//! - **Catalog**: `Ringtone`, `ListingFilter`
//! - **Policy**: point values, levels, withdrawal thresholds
//!
//! # Points
//!
//! Points are whole integers (`i64`). An approved upload is worth 50 points,
//! a level is 500 points, and withdrawals are paid out in points.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod badge;
pub mod catalog;
pub mod error;
pub mod ids;
pub mod policy;
pub mod withdrawal;

pub use account::{Account, AccountPatch};
pub use badge::{default_badges, AwardRecord, Badge, BadgeCondition};
pub use catalog::{
    normalize_key_part, ListingFilter, ListingSort, ModerationStatus, Ringtone,
    DEFAULT_LISTING_LIMIT, MAX_LISTING_LIMIT,
};
pub use error::{Result, RewardsError};
pub use ids::{AccountId, BadgeId, IdError, RingtoneId, WithdrawalId};
pub use policy::{
    level_for, points_for_contributions, WithdrawalPolicy, FIRST_CONTRIBUTION_BONUS,
    FIRST_WITHDRAWAL_AMOUNT, MAX_UPDATE_ATTEMPTS, POINTS_PER_CONTRIBUTION, POINTS_PER_LEVEL,
    REPEAT_WITHDRAWAL_MINIMUM,
};
pub use withdrawal::{WithdrawalRequest, WithdrawalStatus};
