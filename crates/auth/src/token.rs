//! HS256 JWT issuing and verification for signed assertions.

use chrono::{DateTime, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{validate_claims, AssertionClaims, TokenValidationError};

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<AssertionClaims, TokenValidationError>;
}

/// Signs claims into a bearer token.
pub trait JwtIssuer: Send + Sync {
    fn issue(&self, claims: &AssertionClaims) -> Result<String, TokenIssueError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to sign assertion: {0}")]
pub struct TokenIssueError(pub String);

/// Shared-secret (HMAC-SHA256) signer and verifier.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl Hs256Jwt {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks run through `validate_claims` so they share one clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt").finish_non_exhaustive()
    }
}

impl JwtIssuer for Hs256Jwt {
    fn issue(&self, claims: &AssertionClaims) -> Result<String, TokenIssueError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenIssueError(e.to_string()))
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<AssertionClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<AssertionClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenValidationError::InvalidSignature,
                _ => TokenValidationError::Malformed(e.to_string()),
            })?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use civicdesk_core::AccountId;

    use super::*;
    use crate::Role;

    fn claims(now: DateTime<Utc>) -> AssertionClaims {
        AssertionClaims::new(
            AccountId::new(),
            Role::Staff,
            "sam@example.com",
            "sam",
            now,
            Duration::days(1),
        )
        .unwrap()
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let jwt = Hs256Jwt::new("test-secret");
        let now = Utc::now();
        let claims = claims(now);

        let token = jwt.issue(&claims).unwrap();
        let decoded = jwt.validate(&token, now).unwrap();

        assert_eq!(decoded, claims);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let now = Utc::now();
        let token = Hs256Jwt::new("other-secret").issue(&claims(now)).unwrap();

        let err = Hs256Jwt::new("test-secret").validate(&token, now).unwrap_err();
        assert_eq!(err, TokenValidationError::InvalidSignature);
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = Hs256Jwt::new("test-secret");
        let now = Utc::now();
        let token = jwt.issue(&claims(now)).unwrap();

        let err = jwt.validate(&token, now + Duration::days(2)).unwrap_err();
        assert_eq!(err, TokenValidationError::Expired);
    }

    #[test]
    fn garbage_is_malformed() {
        let jwt = Hs256Jwt::new("test-secret");
        let err = jwt.validate("not.a.jwt", Utc::now()).unwrap_err();
        assert!(matches!(err, TokenValidationError::Malformed(_)));
    }
}
