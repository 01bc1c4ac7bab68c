//! Ringtone rewards service.
//!
//! This crate hosts the stateful core of the ringtone site:
//!
//! - [`Ledger`]: points, levels, badges, the first-contribution bonus and
//!   withdrawals, with version-guarded account updates
//! - [`ReadThroughCache`] and [`CachedCatalog`]: TTL-cached catalog reads
//!   that fall back to the database whenever the cache store misbehaves
//! - payout notifications over a signed webhook
//!
//! and the thin HTTP layer that exposes them.
//!
//! # Authentication
//!
//! 1. **Bearer tokens** (HS256, issued by the hosted auth backend) for end users
//! 2. **Service API key** for the moderation pipeline
//! 3. **Admin API key** for the payout desk

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Handlers and ledger operations all return Result
#![allow(clippy::unused_async)] // Handlers need async for consistency

pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod notify;
pub mod routes;
pub mod state;

pub use cache::{CacheStats, ReadThroughCache};
pub use catalog::CachedCatalog;
pub use config::ServiceConfig;
pub use error::ApiError;
pub use ledger::{Ledger, LedgerStores};
pub use notify::{Notifier, WebhookNotifier, WithdrawalNotice};
pub use routes::create_router;
pub use state::AppState;
