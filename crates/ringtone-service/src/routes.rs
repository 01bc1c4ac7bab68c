//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, admin, catalog, contributions, health, withdrawals};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for public catalog reads.
const CATALOG_MAX_CONCURRENT_REQUESTS: usize = 200;

/// Maximum concurrent requests for ledger endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/ringtones` - Cached catalog listing
/// - `GET /v1/ringtones/:slug` - Cached single ringtone
///
/// ## Accounts (bearer token)
/// - `POST /v1/accounts` - Register account
/// - `GET /v1/accounts/me` - Profile with badges and withdrawals
/// - `POST /v1/accounts/me/sync` - Reconcile points and badges
/// - `POST /v1/accounts/:id/first-contribution-bonus` - One-time bonus
/// - `POST /v1/accounts/:id/withdrawals` - Request a withdrawal
///
/// ## Moderation pipeline (service API key)
/// - `POST /v1/contributions/approved` - Credit an approved upload
///
/// ## Payout desk (admin API key)
/// - `GET /v1/admin/withdrawals` - Pending withdrawals
/// - `POST /v1/admin/withdrawals/:id` - Fulfil or reject
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let catalog_routes = Router::new()
        .route("/", get(catalog::list_ringtones))
        .route("/:slug", get(catalog::get_ringtone))
        .layer(ConcurrencyLimitLayer::new(CATALOG_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Accounts
        .route("/accounts", post(accounts::create_account))
        .route("/accounts/me", get(accounts::get_account))
        .route("/accounts/me/sync", post(accounts::sync_account))
        .route(
            "/accounts/:id/first-contribution-bonus",
            post(accounts::grant_first_contribution_bonus),
        )
        .route(
            "/accounts/:id/withdrawals",
            post(withdrawals::request_withdrawal),
        )
        // Moderation pipeline
        .route(
            "/contributions/approved",
            post(contributions::contribution_approved),
        )
        // Payout desk
        .route("/admin/withdrawals", get(admin::list_pending_withdrawals))
        .route("/admin/withdrawals/:id", post(admin::resolve_withdrawal))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1/ringtones", catalog_routes)
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
