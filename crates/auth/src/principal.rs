use civicdesk_core::AccountId;

use crate::{AssertionClaims, Role};

/// An authenticated caller, as asserted by a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: AccountId,
    pub role: Role,
    pub email: String,
    pub display_name: String,
}

impl From<AssertionClaims> for Principal {
    fn from(claims: AssertionClaims) -> Self {
        Self {
            account_id: claims.sub,
            role: claims.role,
            email: claims.email,
            display_name: claims.display_name,
        }
    }
}
