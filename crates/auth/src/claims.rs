use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use civicdesk_core::AccountId;

use crate::token::TokenIssueError;
use crate::Role;

/// Signed assertion claims (transport-agnostic).
///
/// Timestamps are unix seconds so the encoded token stays a standard JWT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Subject / account identifier.
    pub sub: AccountId,

    pub role: Role,

    pub email: String,

    #[serde(rename = "displayName")]
    pub display_name: String,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,
}

impl AssertionClaims {
    /// Fails when `issued_at + ttl` falls outside the representable calendar.
    pub fn new(
        sub: AccountId,
        role: Role,
        email: impl Into<String>,
        display_name: impl Into<String>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, TokenIssueError> {
        let expires_at = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenIssueError(format!("token lifetime of {}s overflows", ttl.num_seconds())))?;

        Ok(Self {
            sub,
            role,
            email: email.into(),
            display_name: display_name.into(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Deterministically validate assertion claims.
///
/// Note: this validates the *claims* only. Signature verification happens in
/// [`crate::token`].
pub fn validate_claims(claims: &AssertionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_at(issued_at: DateTime<Utc>, ttl: Duration) -> AssertionClaims {
        AssertionClaims::new(
            AccountId::new(),
            Role::Citizen,
            "alice@example.com",
            "alice",
            issued_at,
            ttl,
        )
        .unwrap()
    }

    #[test]
    fn fresh_claims_are_valid() {
        let now = Utc::now();
        assert!(validate_claims(&claims_at(now, Duration::days(1)), now).is_ok());
    }

    #[test]
    fn expiry_is_exclusive() {
        let now = Utc::now();
        let claims = claims_at(now, Duration::days(1));
        assert_eq!(
            validate_claims(&claims, now + Duration::days(1)),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn future_issued_claims_are_rejected() {
        let now = Utc::now();
        let claims = claims_at(now + Duration::minutes(5), Duration::days(1));
        assert_eq!(validate_claims(&claims, now), Err(TokenValidationError::NotYetValid));
    }

    #[test]
    fn empty_window_is_rejected() {
        let now = Utc::now();
        let claims = claims_at(now, Duration::zero());
        assert_eq!(
            validate_claims(&claims, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn lifetime_past_the_calendar_end_is_an_error() {
        let result = AssertionClaims::new(
            AccountId::new(),
            Role::Citizen,
            "alice@example.com",
            "alice",
            Utc::now(),
            Duration::seconds(9_000_000_000_000),
        );
        assert!(matches!(result, Err(TokenIssueError(msg)) if msg.contains("overflows")));
    }

    #[test]
    fn display_name_uses_camel_case_on_the_wire() {
        let claims = claims_at(Utc::now(), Duration::days(1));
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["displayName"], "alice");
        assert_eq!(json["role"], "citizen");
    }
}
