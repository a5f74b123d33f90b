// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request verification: shared-secret headers and HMAC signatures.
//!
//! Both checks use constant-time comparison.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Verification failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("secret not configured")]
    NotConfigured,
    #[error("missing verification header")]
    MissingHeader,
    #[error("verification mismatch")]
    Mismatch,
}

/// Verify a shared-secret header value against the configured secret.
pub fn verify_shared_secret(configured: &str, received: &str) -> Result<(), VerifyError> {
    if configured.is_empty() {
        return Err(VerifyError::NotConfigured);
    }

    let expected = configured.as_bytes();
    let actual = received.as_bytes();

    if expected.len() != actual.len() || expected.ct_eq(actual).unwrap_u8() != 1 {
        return Err(VerifyError::Mismatch);
    }

    Ok(())
}

/// Verify a hex-encoded HMAC-SHA256 signature over `body`.
pub fn verify_hmac_sha256(secret: &str, body: &[u8], signature_hex: &str) -> Result<(), VerifyError> {
    if secret.is_empty() {
        return Err(VerifyError::NotConfigured);
    }

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return Err(VerifyError::NotConfigured);
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();
    let expected_hex = hex::encode(expected);

    verify_shared_secret(&expected_hex, signature_hex).map_err(|_| VerifyError::Mismatch)
}

/// Hex-encoded HMAC-SHA256 of `body` (signer side, used by tests and the
/// terminal loopback).
pub fn sign_hmac_sha256(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Stable content fingerprint: hex SHA-256 over `\n`-joined parts.
///
/// Adapters use this so a physical retry of the same message yields an
/// identical fingerprint.
pub fn content_fingerprint(parts: &[&str]) -> String {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
