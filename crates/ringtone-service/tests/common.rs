//! Common test utilities for ringtone-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};

use ringtone_core::{Account, AccountId, Badge, ModerationStatus, Ringtone, RingtoneId};
use ringtone_service::auth::JwtClaims;
use ringtone_service::{create_router, AppState, LedgerStores, ServiceConfig};
use ringtone_store::{BadgeStore, CatalogRepository, MemoryCache, MemoryStore};

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const SERVICE_API_KEY: &str = "test-service-key";
pub const ADMIN_API_KEY: &str = "test-admin-key";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Backing store, for seeding and inspecting state.
    pub store: Arc<MemoryStore>,
    /// A test account id for authenticated requests.
    pub test_account_id: AccountId,
}

impl TestHarness {
    /// Create a new test harness with a fresh in-memory store.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            jwt_secret: Some(JWT_SECRET.into()),
            service_api_key: Some(SERVICE_API_KEY.into()),
            admin_api_key: Some(ADMIN_API_KEY.into()),
            ..ServiceConfig::default()
        };

        let state = AppState::new(
            LedgerStores::from_backend(store.clone()),
            Arc::new(MemoryCache::new()),
            config,
        );
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            test_account_id: AccountId::generate(),
        }
    }

    /// Authorization header for the test account.
    pub fn user_auth_header(&self) -> String {
        bearer_for(&self.test_account_id)
    }

    /// Authorization header for a different, random account.
    pub fn other_user_auth_header() -> String {
        bearer_for(&AccountId::generate())
    }

    /// Seed the test account with a given reward state.
    pub async fn seed_account(&self, points: i64, withdrawal_count: i32) {
        let mut account = Account::new(self.test_account_id, None);
        account.points = points;
        account.level = ringtone_core::level_for(points);
        account.withdrawal_count = withdrawal_count;
        self.store.put_account(account).await;
    }

    /// Add `count` approved uploads by `uploader`.
    pub async fn seed_uploads(&self, uploader: Option<AccountId>, count: usize) {
        for i in 0..count {
            self.store
                .put_ringtone(&ringtone(&format!("track-{}-{i}", RingtoneId::generate()), uploader))
                .await
                .expect("Failed to seed ringtone");
        }
    }

    /// Add a ringtone with a known slug.
    pub async fn seed_ringtone(&self, slug: &str, downloads: i64) {
        let mut r = ringtone(slug, None);
        r.downloads = downloads;
        self.store
            .put_ringtone(&r)
            .await
            .expect("Failed to seed ringtone");
    }

    /// Define an upload-count badge.
    pub async fn seed_badge(&self, name: &str, threshold: i64) {
        self.store
            .put_badge(&Badge::upload_count(name, "", "*", threshold))
            .await
            .expect("Failed to seed badge");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Mint a valid bearer token for an account.
pub fn bearer_for(account_id: &AccountId) -> String {
    let claims = JwtClaims {
        sub: account_id.to_string(),
        aud: Some(serde_json::json!("authenticated")),
        exp: Utc::now().timestamp() + 3_600,
        email: Some("fan@example.com".into()),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign token");
    format!("Bearer {token}")
}

fn ringtone(slug: &str, uploaded_by: Option<AccountId>) -> Ringtone {
    Ringtone {
        id: RingtoneId::generate(),
        slug: slug.into(),
        title: slug.replace('-', " "),
        movie_name: None,
        music_director: None,
        singers: Vec::new(),
        category: "love".into(),
        audio_url: format!("https://cdn.example/{slug}.mp3"),
        downloads: 0,
        likes: 0,
        status: ModerationStatus::Approved,
        uploaded_by,
        created_at: Utc::now(),
    }
}
