//! API-side authorization guard.
//!
//! Runs the role × operation gate against the request caller before any
//! portal call, and separates "who are you?" (401) from "you may not" (403).

use civicdesk_auth::{authorize, AuthzError, Operation, Principal};

use crate::app::errors::ApiError;
use crate::context::RequestCaller;

/// Admit `caller` to `operation`.
///
/// Public operations always pass (a rejected assertion is ignored) and yield
/// the verified principal if there is one. Protected operations require a
/// verified principal whose role the gate allows.
pub fn require<'a>(caller: &'a RequestCaller, operation: Operation) -> Result<Option<&'a Principal>, ApiError> {
    match caller {
        RequestCaller::Verified(principal) => {
            authorize(Some(principal.role), operation)?;
            Ok(Some(principal))
        }
        RequestCaller::Anonymous => {
            authorize(None, operation)?;
            Ok(None)
        }
        RequestCaller::Rejected(reason) => {
            if operation.is_public() {
                Ok(None)
            } else {
                Err(ApiError::Unauthenticated(reason.to_string()))
            }
        }
    }
}

/// Like [`require`], for operations that are never public.
pub fn require_principal(caller: &RequestCaller, operation: Operation) -> Result<&Principal, ApiError> {
    require(caller, operation)?.ok_or_else(|| ApiError::from(AuthzError::Unauthenticated(operation)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use civicdesk_auth::{Role, TokenValidationError};
    use civicdesk_core::AccountId;

    fn verified(role: Role) -> RequestCaller {
        RequestCaller::Verified(Principal {
            account_id: AccountId::new(),
            role,
            email: "a@x.com".to_string(),
            display_name: "a".to_string(),
        })
    }

    #[test]
    fn anonymous_caller_gets_401_for_protected_operations() {
        let err = require(&RequestCaller::Anonymous, Operation::ListOwnApplications).unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn identified_caller_gets_403_when_role_is_denied() {
        let err = require(&verified(Role::Citizen), Operation::CreateService).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn rejected_assertion_is_ignored_for_public_operations() {
        let caller = RequestCaller::Rejected(TokenValidationError::Expired);
        assert!(require(&caller, Operation::ListServices).unwrap().is_none());

        let err = require(&caller, Operation::SubmitApplication).unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn verified_caller_is_returned_for_allowed_operations() {
        let caller = verified(Role::Staff);
        let principal = require_principal(&caller, Operation::ListAllApplications).unwrap();
        assert_eq!(principal.role, Role::Staff);
    }
}
