//! Catalog (ringtone) read models and listing filters.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RewardsError;
use crate::{AccountId, RingtoneId};

/// Largest page a listing may request.
pub const MAX_LISTING_LIMIT: u32 = 100;

/// Page size when none is given.
pub const DEFAULT_LISTING_LIMIT: u32 = 20;

/// A ringtone as served to the catalog pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ringtone {
    /// Record id.
    pub id: RingtoneId,
    /// URL slug, unique among approved ringtones.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Movie or album the track comes from.
    pub movie_name: Option<String>,
    /// Composer.
    pub music_director: Option<String>,
    /// Singers, as entered by the uploader.
    pub singers: Vec<String>,
    /// Category (e.g. "love", "bgm", "devotional").
    pub category: String,
    /// Public audio URL.
    pub audio_url: String,
    /// Download counter.
    pub downloads: i64,
    /// Like counter.
    pub likes: i64,
    /// Moderation status.
    pub status: ModerationStatus,
    /// Uploader, if uploaded by a member.
    pub uploaded_by: Option<AccountId>,
    /// Upload time.
    pub created_at: DateTime<Utc>,
}

/// Moderation status of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    /// Waiting for review.
    Pending,
    /// Visible in the catalog; counts as a contribution.
    Approved,
    /// Declined.
    Rejected,
}

impl ModerationStatus {
    /// Stable name, as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationStatus {
    type Err = RewardsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(RewardsError::ValidationFailed(format!(
                "unknown moderation status: {other}"
            ))),
        }
    }
}

/// Listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSort {
    /// Most downloaded first.
    #[default]
    Trending,
    /// Newest first.
    Latest,
    /// Most liked first.
    Popular,
}

impl ListingSort {
    /// Stable name used in cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trending => "trending",
            Self::Latest => "latest",
            Self::Popular => "popular",
        }
    }
}

/// Parameters of a catalog listing query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingFilter {
    /// Sort order.
    #[serde(default)]
    pub sort: ListingSort,
    /// Restrict to one category.
    #[serde(default)]
    pub category: Option<String>,
    /// Page size.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Rows to skip.
    #[serde(default)]
    pub offset: u32,
}

const fn default_limit() -> u32 {
    DEFAULT_LISTING_LIMIT
}

impl Default for ListingFilter {
    fn default() -> Self {
        Self {
            sort: ListingSort::default(),
            category: None,
            limit: DEFAULT_LISTING_LIMIT,
            offset: 0,
        }
    }
}

impl ListingFilter {
    /// A trending listing of `limit` items.
    #[must_use]
    pub fn trending(limit: u32) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Copy with the limit clamped to `1..=MAX_LISTING_LIMIT` and the
    /// category trimmed and lowercased (blank categories dropped).
    ///
    /// The category keeps its spaces and punctuation so it still matches the
    /// stored value; cache keys sanitize it separately.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let category = self
            .category
            .as_deref()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty());
        Self {
            sort: self.sort,
            category,
            limit: self.limit.clamp(1, MAX_LISTING_LIMIT),
            offset: self.offset,
        }
    }
}

/// Normalize user input used in slugs, categories and cache keys.
///
/// Lowercases, trims, and collapses every run of characters outside
/// `[a-z0-9]` into a single `-`.
#[must_use]
pub fn normalize_key_part(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        } else {
            pending_dash = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize_key_part("  Vaathi Coming!! "), "vaathi-coming");
        assert_eq!(normalize_key_part("BGM"), "bgm");
        assert_eq!(normalize_key_part("a:b::c"), "a-b-c");
        assert_eq!(normalize_key_part("***"), "");
    }

    #[test]
    fn normalized_filter_clamps_limit() {
        let filter = ListingFilter {
            limit: 5_000,
            ..ListingFilter::default()
        };
        assert_eq!(filter.normalized().limit, MAX_LISTING_LIMIT);
        assert_eq!(ListingFilter::trending(0).normalized().limit, 1);
    }

    #[test]
    fn blank_category_is_dropped() {
        let filter = ListingFilter {
            category: Some("   ".into()),
            ..ListingFilter::default()
        };
        assert_eq!(filter.normalized().category, None);
    }

    #[test]
    fn multi_word_category_keeps_its_spaces() {
        let filter = ListingFilter {
            category: Some("  Love Songs ".into()),
            ..ListingFilter::default()
        };
        assert_eq!(filter.normalized().category.as_deref(), Some("love songs"));
    }
}
