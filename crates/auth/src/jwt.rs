//! Token signature verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

/// Verifies a bearer token and yields its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HMAC-SHA256 shared-secret validator.
pub struct Hs256JwtValidator {
    key: DecodingKey,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            key: DecodingKey::from_secret(&secret),
        }
    }
}

impl core::fmt::Debug for Hs256JwtValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtValidator").finish_non_exhaustive()
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        // Time window is checked against the caller's clock in `validate_claims`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<JwtClaims>(token, &self.key, &validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenValidationError::InvalidSignature,
            _ => TokenValidationError::Malformed(e.to_string()),
        })?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
