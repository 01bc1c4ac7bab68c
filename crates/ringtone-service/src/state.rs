//! Application state.

use std::sync::Arc;

use ringtone_store::CacheStore;

use crate::cache::ReadThroughCache;
use crate::catalog::CachedCatalog;
use crate::config::ServiceConfig;
use crate::ledger::{Ledger, LedgerStores};
use crate::notify::{Notifier, WebhookNotifier};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The rewards ledger.
    pub ledger: Ledger,

    /// Cached catalog reads.
    pub catalog: CachedCatalog,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(stores: LedgerStores, cache_store: Arc<dyn CacheStore>, config: ServiceConfig) -> Self {
        let catalog = CachedCatalog::new(
            stores.catalog.clone(),
            ReadThroughCache::new(cache_store),
            config.listing_ttl(),
            config.item_ttl(),
        );

        let mut ledger = Ledger::new(stores);
        match build_notifier(&config) {
            Some(notifier) => ledger = ledger.with_notifier(notifier, config.notify_timeout()),
            None => tracing::warn!("Payout webhook not configured - withdrawals will not be announced"),
        }

        if config.jwt_secret.is_none() {
            tracing::warn!("JWT_SECRET not set - all user requests will be rejected");
        }

        Self {
            ledger,
            catalog,
            config,
        }
    }
}

fn build_notifier(config: &ServiceConfig) -> Option<Arc<dyn Notifier>> {
    let url = config.notify_webhook_url.as_ref()?;

    match WebhookNotifier::new(
        url,
        config.notify_webhook_secret.clone(),
        config.notify_timeout(),
    ) {
        Ok(notifier) => {
            tracing::info!(
                webhook_url = %url,
                signed = config.notify_webhook_secret.is_some(),
                "Payout notifications enabled"
            );
            Some(Arc::new(notifier))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create payout notifier");
            None
        }
    }
}
