//! Local (network-free) verification of identity provider session tokens.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use thiserror::Error;

use super::claim::Principal;
use crate::config::{AuthConfig, JwtKey};

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("token rejected: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("token has no subject")]
    MissingSubject,

    #[error("token authorized party `{0}` is not allowed")]
    UnauthorizedParty(String),
}

/// Verifies signature, expiry, and not-before of a JWT against a fixed key.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
    authorized_party: Option<String>,
}

impl TokenVerifier {
    /// Build a verifier from configuration.
    ///
    /// Returns `Ok(None)` when no key is configured; callers then treat every
    /// request as anonymous.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured RSA key is not valid PEM.
    pub fn from_config(
        cfg: &AuthConfig,
        authorized_party: Option<String>,
    ) -> Result<Option<Self>, jsonwebtoken::errors::Error> {
        let Some(jwt_key) = &cfg.jwt_key else {
            return Ok(None);
        };
        let (key, alg) = match jwt_key {
            JwtKey::RsaPem(pem) => (DecodingKey::from_rsa_pem(pem.as_bytes())?, Algorithm::RS256),
            JwtKey::Secret(secret) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
        };

        let mut validation = Validation::new(alg);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.validate_nbf = true;
        // Session tokens carry `azp` rather than `aud`.
        validation.validate_aud = false;
        if let Some(iss) = &cfg.issuer {
            validation.set_issuer(&[iss]);
        }

        Ok(Some(Self {
            key,
            validation,
            authorized_party,
        }))
    }

    /// Verify `token` and return the principal it names.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError`] for a bad signature, an expired or not-yet-valid
    /// token, a missing subject, or a foreign authorized party.
    pub fn verify(&self, token: &str) -> Result<Principal, VerifyError> {
        let data = decode::<Map<String, Value>>(token, &self.key, &self.validation)?;
        let claims = data.claims;

        let subject_id = claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(VerifyError::MissingSubject)?
            .to_owned();

        let azp = claims.get("azp").and_then(Value::as_str);
        if let (Some(allowed), Some(azp)) = (&self.authorized_party, azp) {
            if azp.trim_end_matches('/') != allowed {
                return Err(VerifyError::UnauthorizedParty(azp.to_owned()));
            }
        }

        Ok(Principal { subject_id, claims })
    }
}
