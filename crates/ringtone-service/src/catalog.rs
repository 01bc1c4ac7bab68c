//! Cached catalog reads.

use std::sync::Arc;
use std::time::Duration;

use ringtone_core::{normalize_key_part, ListingFilter, Result, RewardsError, Ringtone};
use ringtone_store::CatalogRepository;

use crate::cache::ReadThroughCache;

/// Cache key for a listing query.
///
/// Built from the normalized filter, so equivalent filters share an entry.
/// The category is sanitized here only; the repository sees it unchanged.
#[must_use]
pub fn listing_key(filter: &ListingFilter) -> String {
    let filter = filter.normalized();
    let category = filter
        .category
        .as_deref()
        .map_or_else(|| "all".to_string(), normalize_key_part);
    format!(
        "ringtones:list:{}:{}:{}:{}",
        filter.sort.as_str(),
        category,
        filter.limit,
        filter.offset
    )
}

/// Cache key for a slug lookup.
#[must_use]
pub fn slug_key(slug: &str) -> String {
    format!("ringtones:slug:{}", normalize_key_part(slug))
}

/// Catalog repository reads behind the read-through cache.
#[derive(Clone)]
pub struct CachedCatalog {
    repo: Arc<dyn CatalogRepository>,
    cache: ReadThroughCache,
    listing_ttl: Duration,
    item_ttl: Duration,
}

impl CachedCatalog {
    /// Create a cached catalog with the given TTLs.
    #[must_use]
    pub fn new(
        repo: Arc<dyn CatalogRepository>,
        cache: ReadThroughCache,
        listing_ttl: Duration,
        item_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            cache,
            listing_ttl,
            item_ttl,
        }
    }

    /// Approved ringtones matching `filter`.
    ///
    /// # Errors
    ///
    /// `Storage` if the repository fails. Cache problems are never surfaced.
    pub async fn listing(&self, filter: &ListingFilter) -> Result<Vec<Ringtone>> {
        let filter = filter.normalized();
        let key = listing_key(&filter);
        let repo = &self.repo;

        self.cache
            .get_or_load(&key, self.listing_ttl, || async move {
                repo.listing(&filter).await.map_err(RewardsError::from)
            })
            .await
    }

    /// The approved ringtone with this slug.
    ///
    /// # Errors
    ///
    /// `NotFound` if no approved ringtone has the slug (the miss is not
    /// cached), `Storage` if the repository fails.
    pub async fn by_slug(&self, slug: &str) -> Result<Ringtone> {
        let slug = normalize_key_part(slug);
        if slug.is_empty() {
            return Err(ringtone_not_found(&slug));
        }
        let key = slug_key(&slug);
        let repo = &self.repo;

        self.cache
            .get_or_load(&key, self.item_ttl, || async {
                match repo.find_by_slug(&slug).await {
                    Ok(Some(ringtone)) => Ok(ringtone),
                    Ok(None) => Err(ringtone_not_found(&slug)),
                    Err(e) => Err(RewardsError::from(e)),
                }
            })
            .await
    }

    /// Cache counters.
    #[must_use]
    pub fn cache(&self) -> &ReadThroughCache {
        &self.cache
    }
}

fn ringtone_not_found(slug: &str) -> RewardsError {
    RewardsError::NotFound {
        entity: "ringtone",
        id: slug.to_string(),
    }
}
