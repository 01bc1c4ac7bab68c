//! PostgreSQL storage implementation.
//!
//! Account updates are compare-and-swap on the `version` column:
//! `UPDATE ... WHERE id = $1 AND version = $2`. Zero affected rows means
//! either the account is missing or another writer won; a follow-up
//! existence check tells the two apart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use ringtone_core::{
    level_for, Account, AccountId, AccountPatch, Badge, BadgeCondition, BadgeId, ListingFilter,
    ListingSort, ModerationStatus, Ringtone, RingtoneId, WithdrawalId, WithdrawalRequest,
    WithdrawalStatus,
};

use crate::error::{Result, StoreError};
use crate::{AccountStore, AwardStore, BadgeStore, CatalogRepository, WithdrawalLog};

const ACCOUNT_COLUMNS: &str = "id, email, points, level, withdrawal_count, payout_destination, \
     first_contribution_rewarded, version, created_at, updated_at";

const WITHDRAWAL_COLUMNS: &str =
    "id, account_id, amount, payout_destination, status, created_at, resolved_at";

const BADGE_COLUMNS: &str = "id, name, description, icon, condition_type, condition_value";

const RINGTONE_COLUMNS: &str = "id, slug, title, movie_name, music_director, singers, category, \
     audio_url, downloads, likes, status, uploaded_by, created_at";

/// PostgreSQL-backed storage.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be established.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::debug!(max_connections, "PostgreSQL pool established");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn account_exists(&self, id: &AccountId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: Option<String>,
    points: i64,
    level: i32,
    withdrawal_count: i32,
    payout_destination: Option<String>,
    first_contribution_rewarded: bool,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: AccountId::from_uuid(row.id),
            email: row.email,
            points: row.points,
            level: row.level,
            withdrawal_count: row.withdrawal_count,
            payout_destination: row.payout_destination,
            first_contribution_rewarded: row.first_contribution_rewarded,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WithdrawalRow {
    id: String,
    account_id: Uuid,
    amount: i64,
    payout_destination: String,
    status: String,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<WithdrawalRow> for WithdrawalRequest {
    type Error = StoreError;

    fn try_from(row: WithdrawalRow) -> Result<Self> {
        Ok(Self {
            id: row
                .id
                .parse()
                .map_err(|e: ringtone_core::IdError| StoreError::Serialization(e.to_string()))?,
            account_id: AccountId::from_uuid(row.account_id),
            amount: row.amount,
            payout_destination: row.payout_destination,
            status: row
                .status
                .parse()
                .map_err(|e: ringtone_core::RewardsError| StoreError::Serialization(e.to_string()))?,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BadgeRow {
    id: Uuid,
    name: String,
    description: String,
    icon: String,
    condition_type: String,
    condition_value: i64,
}

impl TryFrom<BadgeRow> for Badge {
    type Error = StoreError;

    fn try_from(row: BadgeRow) -> Result<Self> {
        Ok(Self {
            id: BadgeId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            icon: row.icon,
            condition: row
                .condition_type
                .parse()
                .map_err(|e: ringtone_core::RewardsError| StoreError::Serialization(e.to_string()))?,
            threshold: row.condition_value,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RingtoneRow {
    id: Uuid,
    slug: String,
    title: String,
    movie_name: Option<String>,
    music_director: Option<String>,
    singers: Vec<String>,
    category: String,
    audio_url: String,
    downloads: i64,
    likes: i64,
    status: String,
    uploaded_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RingtoneRow> for Ringtone {
    type Error = StoreError;

    fn try_from(row: RingtoneRow) -> Result<Self> {
        Ok(Self {
            id: RingtoneId::from_uuid(row.id),
            slug: row.slug,
            title: row.title,
            movie_name: row.movie_name,
            music_director: row.music_director,
            singers: row.singers,
            category: row.category,
            audio_url: row.audio_url,
            downloads: row.downloads,
            likes: row.likes,
            status: row
                .status
                .parse::<ModerationStatus>()
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
            uploaded_by: row.uploaded_by.map(AccountId::from_uuid),
            created_at: row.created_at,
        })
    }
}

// ============================================================================
// Ports
// ============================================================================

#[async_trait]
impl AccountStore for PgStore {
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>> {
        let row: Option<AccountRow> =
            sqlx::query_as(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Account::from))
    }

    async fn upsert_account(&self, id: &AccountId, email: Option<&str>) -> Result<Account> {
        let row: AccountRow = sqlx::query_as(&format!(
            "INSERT INTO accounts (id, email) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET email = COALESCE(accounts.email, EXCLUDED.email) \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_account(
        &self,
        id: &AccountId,
        expected_version: i64,
        patch: &AccountPatch,
    ) -> Result<Account> {
        let points = patch.points.map(|p| p.max(0));
        let level = points.map(level_for);

        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "UPDATE accounts SET \
                points = COALESCE($3, points), \
                level = COALESCE($4, level), \
                withdrawal_count = COALESCE($5, withdrawal_count), \
                payout_destination = COALESCE($6, payout_destination), \
                first_contribution_rewarded = first_contribution_rewarded OR $7, \
                version = version + 1, \
                updated_at = now() \
             WHERE id = $1 AND version = $2 \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(expected_version)
        .bind(points)
        .bind(level)
        .bind(patch.withdrawal_count)
        .bind(patch.payout_destination.as_deref())
        .bind(patch.mark_first_contribution_rewarded)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into()),
            None if self.account_exists(id).await? => {
                tracing::debug!(account_id = %id, expected_version, "Account version conflict");
                Err(StoreError::VersionConflict {
                    entity: "account",
                    id: id.to_string(),
                })
            }
            None => Err(StoreError::NotFound {
                entity: "account",
                id: id.to_string(),
            }),
        }
    }
}

#[async_trait]
impl WithdrawalLog for PgStore {
    async fn insert_withdrawal(&self, request: &WithdrawalRequest) -> Result<WithdrawalId> {
        sqlx::query(
            "INSERT INTO withdrawal_requests \
             (id, account_id, amount, payout_destination, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(request.id.to_string())
        .bind(request.account_id.as_uuid())
        .bind(request.amount)
        .bind(&request.payout_destination)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .execute(&self.pool)
        .await?;
        Ok(request.id)
    }

    async fn get_withdrawal(&self, id: &WithdrawalId) -> Result<Option<WithdrawalRequest>> {
        let row: Option<WithdrawalRow> = sqlx::query_as(&format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawal_requests WHERE id = $1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(WithdrawalRequest::try_from).transpose()
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<WithdrawalRequest>> {
        let rows: Vec<WithdrawalRow> = sqlx::query_as(&format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawal_requests \
             WHERE status = 'pending' ORDER BY created_at ASC, id ASC LIMIT $1"
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(WithdrawalRequest::try_from).collect()
    }

    async fn list_withdrawals_by_account(
        &self,
        account_id: &AccountId,
        limit: usize,
    ) -> Result<Vec<WithdrawalRequest>> {
        let rows: Vec<WithdrawalRow> = sqlx::query_as(&format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawal_requests \
             WHERE account_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2"
        ))
        .bind(account_id.as_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(WithdrawalRequest::try_from).collect()
    }

    async fn set_withdrawal_status(
        &self,
        id: &WithdrawalId,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    ) -> Result<WithdrawalRequest> {
        let row: Option<WithdrawalRow> = sqlx::query_as(&format!(
            "UPDATE withdrawal_requests SET status = $3, resolved_at = now() \
             WHERE id = $1 AND status = $2 \
             RETURNING {WITHDRAWAL_COLUMNS}"
        ))
        .bind(id.to_string())
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None if self.get_withdrawal(id).await?.is_some() => Err(StoreError::VersionConflict {
                entity: "withdrawal",
                id: id.to_string(),
            }),
            None => Err(StoreError::NotFound {
                entity: "withdrawal",
                id: id.to_string(),
            }),
        }
    }
}

#[async_trait]
impl BadgeStore for PgStore {
    async fn list_badges(
        &self,
        condition: BadgeCondition,
        threshold_at_most: i64,
    ) -> Result<Vec<Badge>> {
        let rows: Vec<BadgeRow> = sqlx::query_as(&format!(
            "SELECT {BADGE_COLUMNS} FROM badges \
             WHERE condition_type = $1 AND condition_value <= $2 \
             ORDER BY condition_value ASC, name ASC"
        ))
        .bind(condition.as_str())
        .bind(threshold_at_most)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Badge::try_from).collect()
    }

    async fn put_badge(&self, badge: &Badge) -> Result<()> {
        sqlx::query(
            "INSERT INTO badges (id, name, description, icon, condition_type, condition_value) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (name) DO UPDATE SET \
                description = EXCLUDED.description, \
                icon = EXCLUDED.icon, \
                condition_type = EXCLUDED.condition_type, \
                condition_value = EXCLUDED.condition_value",
        )
        .bind(badge.id.as_uuid())
        .bind(&badge.name)
        .bind(&badge.description)
        .bind(&badge.icon)
        .bind(badge.condition.as_str())
        .bind(badge.threshold)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AwardStore for PgStore {
    async fn award_ignoring_conflict(
        &self,
        account_id: &AccountId,
        badge_id: &BadgeId,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO user_badges (account_id, badge_id) VALUES ($1, $2) \
             ON CONFLICT (account_id, badge_id) DO NOTHING",
        )
        .bind(account_id.as_uuid())
        .bind(badge_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_awarded(&self, account_id: &AccountId) -> Result<Vec<Badge>> {
        let rows: Vec<BadgeRow> = sqlx::query_as(
            "SELECT b.id, b.name, b.description, b.icon, b.condition_type, b.condition_value \
             FROM user_badges ub JOIN badges b ON b.id = ub.badge_id \
             WHERE ub.account_id = $1 ORDER BY ub.awarded_at ASC",
        )
        .bind(account_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Badge::try_from).collect()
    }
}

#[async_trait]
impl CatalogRepository for PgStore {
    async fn approved_count(&self, account_id: &AccountId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ringtones WHERE uploaded_by = $1 AND status = 'approved'",
        )
        .bind(account_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn listing(&self, filter: &ListingFilter) -> Result<Vec<Ringtone>> {
        let filter = filter.normalized();
        let order_by = match filter.sort {
            ListingSort::Trending => "downloads DESC, created_at DESC, id DESC",
            ListingSort::Latest => "created_at DESC, id DESC",
            ListingSort::Popular => "likes DESC, created_at DESC, id DESC",
        };

        let rows: Vec<RingtoneRow> = sqlx::query_as(&format!(
            "SELECT {RINGTONE_COLUMNS} FROM ringtones \
             WHERE status = 'approved' AND ($1::TEXT IS NULL OR lower(category) = $1) \
             ORDER BY {order_by} LIMIT $2 OFFSET $3"
        ))
        .bind(filter.category.as_deref())
        .bind(i64::from(filter.limit))
        .bind(i64::from(filter.offset))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Ringtone::try_from).collect()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Ringtone>> {
        let row: Option<RingtoneRow> = sqlx::query_as(&format!(
            "SELECT {RINGTONE_COLUMNS} FROM ringtones WHERE slug = $1 AND status = 'approved'"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Ringtone::try_from).transpose()
    }

    async fn put_ringtone(&self, ringtone: &Ringtone) -> Result<()> {
        sqlx::query(
            "INSERT INTO ringtones \
             (id, slug, title, movie_name, music_director, singers, category, audio_url, \
              downloads, likes, status, uploaded_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (id) DO UPDATE SET \
                slug = EXCLUDED.slug, title = EXCLUDED.title, \
                movie_name = EXCLUDED.movie_name, music_director = EXCLUDED.music_director, \
                singers = EXCLUDED.singers, category = EXCLUDED.category, \
                audio_url = EXCLUDED.audio_url, downloads = EXCLUDED.downloads, \
                likes = EXCLUDED.likes, status = EXCLUDED.status, \
                uploaded_by = EXCLUDED.uploaded_by",
        )
        .bind(ringtone.id.as_uuid())
        .bind(&ringtone.slug)
        .bind(&ringtone.title)
        .bind(ringtone.movie_name.as_deref())
        .bind(ringtone.music_director.as_deref())
        .bind(&ringtone.singers)
        .bind(&ringtone.category)
        .bind(&ringtone.audio_url)
        .bind(ringtone.downloads)
        .bind(ringtone.likes)
        .bind(ringtone.status.as_str())
        .bind(ringtone.uploaded_by.map(|id| *id.as_uuid()))
        .bind(ringtone.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
