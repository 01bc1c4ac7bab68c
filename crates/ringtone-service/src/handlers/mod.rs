//! API handlers.
//!
//! Every successful response body carries `"success": true` next to its
//! payload fields; errors carry `"success": false` (see [`crate::error`]).

use axum::Json;
use serde::Serialize;

pub mod accounts;
pub mod admin;
pub mod catalog;
pub mod contributions;
pub mod health;
pub mod withdrawals;

/// Successful response envelope.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    /// Always `true`.
    pub success: bool,
    /// Payload fields, flattened into the envelope.
    #[serde(flatten)]
    pub data: T,
}

/// Wrap a payload in the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        data,
    })
}
