//! Payout notifications.
//!
//! When a withdrawal is recorded, operators are told about it through an
//! outgoing webhook. Delivery is best-effort: it runs on a detached task with
//! a bounded wait, and every failure is logged and dropped. A withdrawal never
//! fails because its notification did.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use ringtone_core::{AccountId, WithdrawalId};

use crate::crypto::hmac_sha256_hex;

/// Header carrying the hex HMAC-SHA256 of the request body.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Error type for notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Receiver answered with a non-success status.
    #[error("webhook rejected notification with status {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What operators need to pay out a withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalNotice {
    /// Requesting account.
    pub account_id: AccountId,
    /// Recorded request.
    pub withdrawal_id: WithdrawalId,
    /// Effective (debited) amount in points.
    pub amount: i64,
    /// Where to send the payout.
    pub payout_destination: String,
    /// When the request was recorded.
    pub requested_at: DateTime<Utc>,
}

/// A channel that can deliver withdrawal notices.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notice.
    async fn send(&self, notice: &WithdrawalNotice) -> Result<(), NotifyError>;
}

/// Posts notices as JSON to a webhook, optionally signed.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    secret: Option<String>,
}

impl WebhookNotifier {
    /// Create a notifier for `url`.
    ///
    /// `timeout` bounds each HTTP request; the dispatcher applies its own
    /// bound on top.
    pub fn new(
        url: impl Into<String>,
        secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            secret,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notice: &WithdrawalNotice) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(notice)?;

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json");
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, hmac_sha256_hex(secret, &body));
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }

        tracing::debug!(
            withdrawal_id = %notice.withdrawal_id,
            "Payout notification delivered"
        );
        Ok(())
    }
}

/// Deliver `notice` on a detached task, giving up after `timeout`.
///
/// Outcomes are only logged. The handle is returned so tests can wait for
/// completion; production callers drop it.
pub fn dispatch_best_effort(
    notifier: Arc<dyn Notifier>,
    notice: WithdrawalNotice,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, notifier.send(&notice)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(
                    account_id = %notice.account_id,
                    withdrawal_id = %notice.withdrawal_id,
                    error = %e,
                    "Failed to send payout notification"
                );
            }
            Err(_) => {
                tracing::warn!(
                    account_id = %notice.account_id,
                    withdrawal_id = %notice.withdrawal_id,
                    timeout_ms = timeout.as_millis(),
                    "Payout notification timed out"
                );
            }
        }
    })
}
