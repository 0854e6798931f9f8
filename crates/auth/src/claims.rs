use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fablab_core::UserId;

use crate::Role;

/// Claims carried by a FabLab access token.
///
/// Tokens are issued by the identity service; this backend only verifies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Acting user. Tokens from the identity service name it `userId`.
    #[serde(alias = "userId")]
    pub sub: UserId,

    pub email: String,

    pub role: Role,

    /// Issued-at timestamp (seconds since epoch on the wire).
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp (seconds since epoch on the wire).
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid token signature")]
    InvalidSignature,
}

/// Check the token time window against `now`. Signatures are verified in
/// [`crate::jwt`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn claims(issued: i64, expires: i64) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            email: "admin@fablab.com".to_string(),
            role: Role::Admin,
            issued_at: Utc.timestamp_opt(issued, 0).unwrap(),
            expires_at: Utc.timestamp_opt(expires, 0).unwrap(),
        }
    }

    #[test]
    fn window_checks() {
        let c = claims(1_000, 2_000);
        let at = |s| Utc.timestamp_opt(s, 0).unwrap();
        assert_eq!(validate_claims(&c, at(999)), Err(TokenValidationError::NotYetValid));
        assert_eq!(validate_claims(&c, at(1_500)), Ok(()));
        assert_eq!(validate_claims(&c, at(2_000)), Err(TokenValidationError::Expired));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let c = claims(2_000, 2_000);
        let now = c.issued_at + Duration::seconds(1);
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::InvalidTimeWindow));
    }

    #[test]
    fn timestamps_serialize_as_seconds() {
        let c = claims(1_000, 2_000);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["iat"], 1_000);
        assert_eq!(json["exp"], 2_000);
        assert_eq!(json["role"], "ADMIN");
    }

    #[test]
    fn user_id_is_accepted_in_place_of_sub() {
        let user = UserId::new();
        let claims: JwtClaims = serde_json::from_value(serde_json::json!({
            "userId": user,
            "email": "admin@fablab.com",
            "role": "ADMIN",
            "iat": 1_000,
            "exp": 2_000,
        }))
        .unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Admin);
    }
}
