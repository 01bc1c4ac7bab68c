//! Storage layer for the ringtone rewards ledger.
//!
//! The ledger talks to its collaborators through the async traits defined
//! here. Three backends implement them:
//!
//! - [`MemoryStore`] / [`MemoryCache`]: in-process maps, used for tests and
//!   local development.
//! - [`PgStore`]: PostgreSQL via `sqlx`, the production account, withdrawal,
//!   badge and catalog store.
//! - `RocksCache` (feature `rocksdb-backend`): a persistent cache store.
//!
//! # Guarded account updates
//!
//! [`AccountStore::update_account`] only succeeds when the stored `version`
//! still equals the version the caller read; otherwise it returns
//! [`StoreError::VersionConflict`] and the caller re-reads. This is what
//! keeps two concurrent withdrawals from both spending the same balance.
//!
//! # Example
//!
//! ```no_run
//! use ringtone_core::{AccountId, AccountPatch};
//! use ringtone_store::{AccountStore, MemoryStore};
//!
//! # async fn example() -> ringtone_store::Result<()> {
//! let store = MemoryStore::new();
//! let id = AccountId::generate();
//! let account = store.upsert_account(&id, None).await?;
//! let updated = store
//!     .update_account(&id, account.version, &AccountPatch::points(50))
//!     .await?;
//! assert_eq!(updated.points, 50);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;

use std::time::Duration;

use async_trait::async_trait;
use ringtone_core::{
    Account, AccountId, AccountPatch, Badge, BadgeCondition, BadgeId, ListingFilter, Ringtone,
    WithdrawalId, WithdrawalRequest, WithdrawalStatus,
};

pub use error::{Result, StoreError};
pub use memory::{MemoryCache, MemoryStore};
pub use postgres::PgStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksCache;

/// Account records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Get an account by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>>;

    /// Create the account with a zero balance if it does not exist.
    ///
    /// An existing account keeps its reward state; only a missing email is
    /// filled in.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn upsert_account(&self, id: &AccountId, email: Option<&str>) -> Result<Account>;

    /// Apply `patch` if the stored version equals `expected_version`.
    ///
    /// Returns the account as written, with `version` incremented.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the account does not exist.
    /// - `StoreError::VersionConflict` if another writer got there first.
    async fn update_account(
        &self,
        id: &AccountId,
        expected_version: i64,
        patch: &AccountPatch,
    ) -> Result<Account>;
}

/// Append-only withdrawal request log.
#[async_trait]
pub trait WithdrawalLog: Send + Sync {
    /// Insert a new request.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn insert_withdrawal(&self, request: &WithdrawalRequest) -> Result<WithdrawalId>;

    /// Get a request by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn get_withdrawal(&self, id: &WithdrawalId) -> Result<Option<WithdrawalRequest>>;

    /// Pending requests, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn list_pending(&self, limit: usize) -> Result<Vec<WithdrawalRequest>>;

    /// Requests for one account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn list_withdrawals_by_account(
        &self,
        account_id: &AccountId,
        limit: usize,
    ) -> Result<Vec<WithdrawalRequest>>;

    /// Move a request from `from` to `to`, stamping `resolved_at`.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the request does not exist.
    /// - `StoreError::VersionConflict` if its status is no longer `from`.
    async fn set_withdrawal_status(
        &self,
        id: &WithdrawalId,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    ) -> Result<WithdrawalRequest>;
}

/// Badge definitions.
#[async_trait]
pub trait BadgeStore: Send + Sync {
    /// Badges with the given condition whose threshold is at most `threshold_at_most`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn list_badges(
        &self,
        condition: BadgeCondition,
        threshold_at_most: i64,
    ) -> Result<Vec<Badge>>;

    /// Insert or replace a badge definition (keyed by name).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn put_badge(&self, badge: &Badge) -> Result<()>;
}

/// Badges held by accounts.
#[async_trait]
pub trait AwardStore: Send + Sync {
    /// Record that `account_id` holds `badge_id`.
    ///
    /// Returns `true` if the award is new, `false` if it already existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn award_ignoring_conflict(&self, account_id: &AccountId, badge_id: &BadgeId)
        -> Result<bool>;

    /// Badges held by an account, in award order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn list_awarded(&self, account_id: &AccountId) -> Result<Vec<Badge>>;
}

/// Catalog reads (and the writes tests and seeding need).
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Number of approved uploads by an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn approved_count(&self, account_id: &AccountId) -> Result<i64>;

    /// Approved ringtones matching a filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn listing(&self, filter: &ListingFilter) -> Result<Vec<Ringtone>>;

    /// The approved ringtone with this slug, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Ringtone>>;

    /// Insert or replace a ringtone.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn put_ringtone(&self, ringtone: &Ringtone) -> Result<()>;
}

/// Key-value cache with per-entry TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a live entry. Expired entries are reported as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is unreachable.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is unreachable.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;
}
