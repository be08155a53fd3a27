use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use civicdesk_auth::Role;
use civicdesk_core::{AccountId, DomainError, DomainResult};

const MAX_DISPLAY_NAME_CHARS: usize = 64;
const MAX_EMAIL_CHARS: usize = 254;

/// Normalized email address (trimmed, lowercase).
///
/// Uniqueness of accounts is decided on this normalized form, which makes the
/// email constraint case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let email = raw.trim().to_lowercase();
        if email.is_empty() {
            return Err(DomainError::validation("email is required"));
        }
        if email.chars().count() > MAX_EMAIL_CHARS {
            return Err(DomainError::validation("email is too long"));
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
                Ok(Self(email))
            }
            _ => Err(DomainError::validation("invalid email format")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Public display name (trimmed; compared exactly).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(DomainError::validation("display name cannot be empty"));
        }
        if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
            return Err(DomainError::validation(format!(
                "display name cannot exceed {MAX_DISPLAY_NAME_CHARS} characters"
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Account record.
///
/// # Invariants
/// - `email` and `display_name` are unique across accounts (enforced by the store).
/// - `role` never changes after creation.
/// - `credential_hash` is a salted one-way hash, never the plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub display_name: DisplayName,
    pub email: EmailAddress,
    pub credential_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}
