//! Badge definitions and award records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RewardsError;
use crate::{AccountId, BadgeId};

/// A named achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    /// Badge id.
    pub id: BadgeId,
    /// Unique display name.
    pub name: String,
    /// What the badge is for.
    pub description: String,
    /// Icon reference (emoji or asset path).
    pub icon: String,
    /// How eligibility is decided.
    pub condition: BadgeCondition,
    /// Threshold for `UploadCount` badges.
    pub threshold: i64,
}

impl Badge {
    /// Define a badge earned after `threshold` approved uploads.
    #[must_use]
    pub fn upload_count(name: &str, description: &str, icon: &str, threshold: i64) -> Self {
        Self {
            id: BadgeId::generate(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            condition: BadgeCondition::UploadCount,
            threshold,
        }
    }

    /// Whether an account with `approved` contributions qualifies.
    ///
    /// Manual badges never qualify automatically.
    #[must_use]
    pub fn is_earned_by(&self, approved: i64) -> bool {
        self.condition == BadgeCondition::UploadCount && approved >= self.threshold
    }
}

/// Badge condition type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCondition {
    /// Earned by reaching an approved-upload count.
    UploadCount,
    /// Granted by hand, never evaluated automatically.
    Manual,
}

impl BadgeCondition {
    /// Stable name, as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UploadCount => "upload_count",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for BadgeCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BadgeCondition {
    type Err = RewardsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload_count" => Ok(Self::UploadCount),
            "manual" => Ok(Self::Manual),
            other => Err(RewardsError::ValidationFailed(format!(
                "unknown badge condition: {other}"
            ))),
        }
    }
}

/// The upload-count badges every deployment starts with.
#[must_use]
pub fn default_badges() -> Vec<Badge> {
    vec![
        Badge::upload_count("First Beat", "First approved upload", "🎵", 1),
        Badge::upload_count("Rhythm Maker", "Ten approved uploads", "🥁", 10),
        Badge::upload_count("Music Director", "Fifty approved uploads", "🎼", 50),
    ]
}

/// A badge held by an account. Unique per (account, badge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardRecord {
    /// Holder.
    pub account_id: AccountId,
    /// Badge held.
    pub badge_id: BadgeId,
    /// When it was first awarded.
    pub awarded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_badge_earned_at_threshold() {
        let badge = Badge::upload_count("First Beat", "First approved upload", "🎵", 1);
        assert!(!badge.is_earned_by(0));
        assert!(badge.is_earned_by(1));
        assert!(badge.is_earned_by(7));
    }

    #[test]
    fn default_badges_have_distinct_names_and_rising_thresholds() {
        let badges = default_badges();
        let thresholds: Vec<_> = badges.iter().map(|b| b.threshold).collect();
        assert_eq!(thresholds, [1, 10, 50]);
        assert!(badges.iter().all(|b| b.condition == BadgeCondition::UploadCount));
    }

    #[test]
    fn manual_badges_are_never_earned_automatically() {
        let mut badge = Badge::upload_count("Curator", "Hand picked", "⭐", 0);
        badge.condition = BadgeCondition::Manual;
        assert!(!badge.is_earned_by(1_000));
    }
}
