//! Signing and comparison helpers.
//!
//! Outgoing payout notifications are signed with HMAC-SHA256 so the receiver
//! can check they came from this service. API keys presented by callers are
//! compared in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 of `body` under `secret`, hex-encoded (64 characters).
///
/// # Panics
///
/// Never in practice: HMAC-SHA256 accepts keys of any size (RFC 2104).
#[must_use]
pub fn hmac_sha256_hex(secret: &str, body: &[u8]) -> String {
    // INVARIANT: `new_from_slice` only fails for fixed-size-key MACs.
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time string comparison.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_known_vector() {
        let sig = hmac_sha256_hex("key", b"The quick brown fox jumps over the lazy dog");
        assert_eq!(
            sig,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn signature_depends_on_secret() {
        assert_ne!(
            hmac_sha256_hex("secret-a", b"{}"),
            hmac_sha256_hex("secret-b", b"{}")
        );
    }

    #[test]
    fn constant_time_eq_compares_contents() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(constant_time_eq("", ""));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
        assert!(!constant_time_eq("abc", "ABC"));
    }
}
