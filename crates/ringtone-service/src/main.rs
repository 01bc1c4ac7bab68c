//! Ringtone Rewards Service - points, withdrawals and cached catalog reads.
//!
//! This is the main entry point for the ringtone rewards service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ringtone_core::default_badges;
use ringtone_service::{create_router, AppState, Ledger, LedgerStores, ServiceConfig};
use ringtone_store::{CacheStore, MemoryCache, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ringtone=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Ringtone Rewards Service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        database_configured = %config.database_url.is_some(),
        cache_dir = ?config.cache_dir,
        notify_configured = %config.notify_webhook_url.is_some(),
        listing_ttl_secs = config.listing_cache_ttl_seconds,
        item_ttl_secs = config.item_cache_ttl_seconds,
        "Service configuration loaded"
    );

    let stores = if let Some(url) = &config.database_url {
        tracing::info!(max_connections = config.database_max_connections, "Connecting to PostgreSQL");
        let store = PgStore::connect(url, config.database_max_connections).await?;
        store.migrate().await?;
        tracing::info!("Database migrations applied");
        LedgerStores::from_backend(Arc::new(store))
    } else {
        tracing::warn!("DATABASE_URL not set - using in-memory store, data will not persist");
        LedgerStores::from_backend(Arc::new(MemoryStore::new()))
    };

    Ledger::new(stores.clone())
        .install_badges(&default_badges())
        .await?;

    let cache_store = open_cache_store(&config)?;

    let state = AppState::new(stores, cache_store, config.clone());
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "rocksdb-backend")]
fn open_cache_store(
    config: &ServiceConfig,
) -> Result<Arc<dyn CacheStore>, Box<dyn std::error::Error>> {
    if let Some(dir) = &config.cache_dir {
        tracing::info!(path = %dir, "Opening RocksDB cache");
        return Ok(Arc::new(ringtone_store::RocksCache::open(dir)?));
    }
    tracing::info!("CACHE_DIR not set - using in-memory cache");
    Ok(Arc::new(MemoryCache::new()))
}

#[cfg(not(feature = "rocksdb-backend"))]
#[allow(clippy::unnecessary_wraps)]
fn open_cache_store(
    config: &ServiceConfig,
) -> Result<Arc<dyn CacheStore>, Box<dyn std::error::Error>> {
    if config.cache_dir.is_some() {
        tracing::warn!("CACHE_DIR ignored - built without the rocksdb-backend feature");
    }
    Ok(Arc::new(MemoryCache::new()))
}
