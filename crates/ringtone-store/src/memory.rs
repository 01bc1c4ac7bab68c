//! In-memory storage backends.
//!
//! `MemoryStore` implements every ledger and catalog port over `tokio`
//! locks; `MemoryCache` is a TTL map keyed by string. Both are used by the
//! test suites and when the service runs without a database.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tokio::time::Instant;

use ringtone_core::{
    Account, AccountId, AccountPatch, AwardRecord, Badge, BadgeCondition, BadgeId, ListingFilter,
    ListingSort, ModerationStatus, Ringtone, RingtoneId, WithdrawalId, WithdrawalRequest,
    WithdrawalStatus,
};

use crate::error::{Result, StoreError};
use crate::{AccountStore, AwardStore, BadgeStore, CacheStore, CatalogRepository, WithdrawalLog};

/// In-memory implementation of all ledger and catalog ports.
#[derive(Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
    withdrawals: RwLock<BTreeMap<WithdrawalId, WithdrawalRequest>>,
    badges: RwLock<HashMap<BadgeId, Badge>>,
    awards: RwLock<Vec<AwardRecord>>,
    ringtones: RwLock<HashMap<RingtoneId, Ringtone>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an account as-is, replacing any existing record.
    ///
    /// Lets tests and seeding start from an arbitrary reward state.
    pub async fn put_account(&self, account: Account) {
        self.accounts.write().await.insert(account.id, account);
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(id).cloned())
    }

    async fn upsert_account(&self, id: &AccountId, email: Option<&str>) -> Result<Account> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .entry(*id)
            .or_insert_with(|| Account::new(*id, email.map(String::from)));
        if account.email.is_none() {
            account.email = email.map(String::from);
        }
        Ok(account.clone())
    }

    async fn update_account(
        &self,
        id: &AccountId,
        expected_version: i64,
        patch: &AccountPatch,
    ) -> Result<Account> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(id).ok_or_else(|| StoreError::NotFound {
            entity: "account",
            id: id.to_string(),
        })?;

        if account.version != expected_version {
            return Err(StoreError::VersionConflict {
                entity: "account",
                id: id.to_string(),
            });
        }

        account.apply(patch);
        Ok(account.clone())
    }
}

#[async_trait]
impl WithdrawalLog for MemoryStore {
    async fn insert_withdrawal(&self, request: &WithdrawalRequest) -> Result<WithdrawalId> {
        self.withdrawals
            .write()
            .await
            .insert(request.id, request.clone());
        Ok(request.id)
    }

    async fn get_withdrawal(&self, id: &WithdrawalId) -> Result<Option<WithdrawalRequest>> {
        Ok(self.withdrawals.read().await.get(id).cloned())
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<WithdrawalRequest>> {
        Ok(self
            .withdrawals
            .read()
            .await
            .values()
            .filter(|w| w.status == WithdrawalStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_withdrawals_by_account(
        &self,
        account_id: &AccountId,
        limit: usize,
    ) -> Result<Vec<WithdrawalRequest>> {
        Ok(self
            .withdrawals
            .read()
            .await
            .values()
            .rev()
            .filter(|w| w.account_id == *account_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn set_withdrawal_status(
        &self,
        id: &WithdrawalId,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    ) -> Result<WithdrawalRequest> {
        let mut withdrawals = self.withdrawals.write().await;
        let request = withdrawals.get_mut(id).ok_or_else(|| StoreError::NotFound {
            entity: "withdrawal",
            id: id.to_string(),
        })?;

        if request.status != from {
            return Err(StoreError::VersionConflict {
                entity: "withdrawal",
                id: id.to_string(),
            });
        }

        request.status = to;
        request.resolved_at = Some(Utc::now());
        Ok(request.clone())
    }
}

#[async_trait]
impl BadgeStore for MemoryStore {
    async fn list_badges(
        &self,
        condition: BadgeCondition,
        threshold_at_most: i64,
    ) -> Result<Vec<Badge>> {
        let mut badges: Vec<Badge> = self
            .badges
            .read()
            .await
            .values()
            .filter(|b| b.condition == condition && b.threshold <= threshold_at_most)
            .cloned()
            .collect();
        badges.sort_by(|a, b| a.threshold.cmp(&b.threshold).then(a.name.cmp(&b.name)));
        Ok(badges)
    }

    async fn put_badge(&self, badge: &Badge) -> Result<()> {
        let mut badges = self.badges.write().await;
        // Names are unique; an existing badge keeps its id so awards stay valid.
        let id = badges
            .values()
            .find(|existing| existing.name == badge.name)
            .map_or(badge.id, |existing| existing.id);
        badges.insert(
            id,
            Badge {
                id,
                ..badge.clone()
            },
        );
        Ok(())
    }
}

#[async_trait]
impl AwardStore for MemoryStore {
    async fn award_ignoring_conflict(
        &self,
        account_id: &AccountId,
        badge_id: &BadgeId,
    ) -> Result<bool> {
        let mut awards = self.awards.write().await;
        if awards
            .iter()
            .any(|a| a.account_id == *account_id && a.badge_id == *badge_id)
        {
            return Ok(false);
        }
        awards.push(AwardRecord {
            account_id: *account_id,
            badge_id: *badge_id,
            awarded_at: Utc::now(),
        });
        Ok(true)
    }

    async fn list_awarded(&self, account_id: &AccountId) -> Result<Vec<Badge>> {
        let awards = self.awards.read().await;
        let badges = self.badges.read().await;
        Ok(awards
            .iter()
            .filter(|a| a.account_id == *account_id)
            .filter_map(|a| badges.get(&a.badge_id).cloned())
            .collect())
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn approved_count(&self, account_id: &AccountId) -> Result<i64> {
        let count = self
            .ringtones
            .read()
            .await
            .values()
            .filter(|r| {
                r.status == ModerationStatus::Approved && r.uploaded_by == Some(*account_id)
            })
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn listing(&self, filter: &ListingFilter) -> Result<Vec<Ringtone>> {
        let filter = filter.normalized();
        let mut rows: Vec<Ringtone> = self
            .ringtones
            .read()
            .await
            .values()
            .filter(|r| r.status == ModerationStatus::Approved)
            .filter(|r| {
                filter
                    .category
                    .as_deref()
                    .map_or(true, |c| r.category.to_lowercase() == c)
            })
            .cloned()
            .collect();

        // Same order as the SQL listing, down to the id tie-break.
        rows.sort_by(|a, b| {
            let primary = match filter.sort {
                ListingSort::Trending => b.downloads.cmp(&a.downloads),
                ListingSort::Latest => std::cmp::Ordering::Equal,
                ListingSort::Popular => b.likes.cmp(&a.likes),
            };
            primary
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });

        Ok(rows
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Ringtone>> {
        Ok(self
            .ringtones
            .read()
            .await
            .values()
            .find(|r| r.slug == slug && r.status == ModerationStatus::Approved)
            .cloned())
    }

    async fn put_ringtone(&self, ringtone: &Ringtone) -> Result<()> {
        self.ringtones
            .write()
            .await
            .insert(ringtone.id, ringtone.clone());
        Ok(())
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Default number of entries kept by [`MemoryCache`].
const DEFAULT_CACHE_CAPACITY: usize = 10_000;

struct Entry {
    expires_at: Instant,
    value: Vec<u8>,
}

/// In-memory TTL cache.
///
/// Expiry uses `tokio::time::Instant`, so tests can drive it with a paused
/// clock. When full, expired entries are purged first, then the entry
/// closest to expiry is evicted.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    capacity: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl MemoryCache {
    /// Create a cache with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding at most `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if entries.len() >= self.capacity && !entries.contains_key(key) {
            entries.retain(|_, e| e.expires_at > now);
            if entries.len() >= self.capacity {
                let victim = entries
                    .iter()
                    .min_by_key(|(_, e)| e.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(victim) = victim {
                    entries.remove(&victim);
                }
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                expires_at: now + ttl,
                value: value.to_vec(),
            },
        );
        Ok(())
    }
}
