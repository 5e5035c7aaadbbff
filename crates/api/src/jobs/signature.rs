//! Webhook request signing as used by the Inngest serve protocol.
//!
//! Signatures arrive in `X-Inngest-Signature` as `t=<unix secs>&s=<hex>`,
//! where `s = HMAC-SHA256(key, body || t)` and `key` is the signing key with
//! its `signkey-<env>-` prefix removed.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a signed request.
pub const MAX_SIGNATURE_AGE_SECS: i64 = 5 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,

    #[error("malformed signature header")]
    Malformed,

    #[error("signature timestamp outside the accepted window")]
    Expired,

    #[error("signature mismatch")]
    Mismatch,
}

/// Verify a signature header against the raw request body.
///
/// # Errors
///
/// Returns a [`SignatureError`] describing why the request is not authentic.
pub fn verify(
    header: Option<&str>,
    body: &[u8],
    signing_key: &str,
    now_secs: i64,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;

    let mut timestamp = None;
    let mut signature = None;
    for pair in header.split('&') {
        match pair.split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("s", v)) => signature = Some(v),
            _ => {}
        }
    }
    let (Some(t), Some(s)) = (timestamp, signature) else {
        return Err(SignatureError::Malformed);
    };

    let issued: i64 = t.parse().map_err(|_| SignatureError::Malformed)?;
    if now_secs.abs_diff(issued) > MAX_SIGNATURE_AGE_SECS.unsigned_abs() {
        return Err(SignatureError::Expired);
    }
    let expected = hex::decode(s).map_err(|_| SignatureError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(key_material(signing_key).as_bytes())
        .map_err(|_| SignatureError::Malformed)?;
    mac.update(body);
    mac.update(t.as_bytes());
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

/// Produce the `t=..&s=..` header the bus would send for `body`.
#[cfg(test)]
pub(crate) fn sign(body: &[u8], signing_key: &str, now_secs: i64) -> String {
    let t = now_secs.to_string();
    let mut mac = HmacSha256::new_from_slice(key_material(signing_key).as_bytes()).unwrap();
    mac.update(body);
    mac.update(t.as_bytes());
    format!("t={t}&s={}", hex::encode(mac.finalize().into_bytes()))
}

/// Bearer credential for bus management calls: the key prefix followed by the
/// hex SHA-256 of the key material.
pub fn hashed_signing_key(signing_key: &str) -> String {
    let material = key_material(signing_key);
    let prefix = &signing_key[..signing_key.len() - material.len()];
    let digest = match hex::decode(material) {
        Ok(bytes) => Sha256::digest(bytes),
        Err(_) => Sha256::digest(material.as_bytes()),
    };
    format!("{prefix}{}", hex::encode(digest))
}

/// Strip a leading `signkey-<env>-` prefix.
fn key_material(signing_key: &str) -> &str {
    signing_key
        .strip_prefix("signkey-")
        .and_then(|rest| rest.split_once('-'))
        .map_or(signing_key, |(_, material)| material)
}
