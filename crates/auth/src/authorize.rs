//! The authorization gate.
//!
//! - No IO
//! - No panics
//! - No business logic (pure policy check over a fixed table)

use thiserror::Error;

use crate::{Operation, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// The caller presented no valid assertion and the operation is not public.
    #[error("authentication required for '{0}'")]
    Unauthenticated(Operation),

    /// The caller is identified but their role may not perform the operation.
    #[error("forbidden: role '{role}' may not perform '{operation}'")]
    Forbidden { role: Role, operation: Operation },
}

/// Decide whether `role` (or an anonymous caller, `None`) may perform `operation`.
pub fn is_allowed(role: Option<Role>, operation: Operation) -> bool {
    match operation {
        Operation::ListServices | Operation::Register | Operation::Login => true,
        Operation::CreateService | Operation::UpdateService | Operation::DeleteService => {
            role == Some(Role::Officer)
        }
        Operation::SubmitApplication | Operation::ListOwnApplications => {
            role == Some(Role::Citizen)
        }
        Operation::ListAllApplications | Operation::ChangeApplicationStatus => {
            matches!(role, Some(Role::Staff | Role::Officer))
        }
        Operation::ViewOwnProfile => role.is_some(),
    }
}

/// Gate a request: anonymous denials are authentication failures, identified
/// denials are authorization failures.
pub fn authorize(role: Option<Role>, operation: Operation) -> Result<(), AuthzError> {
    if is_allowed(role, operation) {
        return Ok(());
    }
    match role {
        None => Err(AuthzError::Unauthenticated(operation)),
        Some(role) => Err(AuthzError::Forbidden { role, operation }),
    }
}

/// Roles that may perform `operation` (anonymous excluded).
pub fn allowed_roles(operation: Operation) -> Vec<Role> {
    Role::ALL
        .into_iter()
        .filter(|r| is_allowed(Some(*r), operation))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::Operation::*;

    const C: Option<Role> = Some(Role::Citizen);
    const S: Option<Role> = Some(Role::Staff);
    const O: Option<Role> = Some(Role::Officer);
    const A: Option<Role> = None;

    /// (operation, citizen, staff, officer, anonymous)
    const TABLE: [(Operation, bool, bool, bool, bool); 11] = [
        (ListServices, true, true, true, true),
        (CreateService, false, false, true, false),
        (UpdateService, false, false, true, false),
        (DeleteService, false, false, true, false),
        (SubmitApplication, true, false, false, false),
        (ListOwnApplications, true, false, false, false),
        (ListAllApplications, false, true, true, false),
        (ChangeApplicationStatus, false, true, true, false),
        (Register, true, true, true, true),
        (Login, true, true, true, true),
        (ViewOwnProfile, true, true, true, false),
    ];

    #[test]
    fn gate_matches_access_table() {
        for (op, citizen, staff, officer, anonymous) in TABLE {
            assert_eq!(is_allowed(C, op), citizen, "citizen / {op}");
            assert_eq!(is_allowed(S, op), staff, "staff / {op}");
            assert_eq!(is_allowed(O, op), officer, "officer / {op}");
            assert_eq!(is_allowed(A, op), anonymous, "anonymous / {op}");
        }
    }

    #[test]
    fn anonymous_is_only_allowed_public_operations() {
        for op in Operation::ALL {
            assert_eq!(is_allowed(A, op), op.is_public(), "{op}");
        }
    }

    #[test]
    fn anonymous_denial_is_authentication_error() {
        assert_eq!(
            authorize(A, SubmitApplication),
            Err(AuthzError::Unauthenticated(SubmitApplication))
        );
    }

    #[test]
    fn identified_denial_is_authorization_error() {
        assert_eq!(
            authorize(S, CreateService),
            Err(AuthzError::Forbidden {
                role: Role::Staff,
                operation: CreateService
            })
        );
    }

    #[test]
    fn allowed_roles_for_status_change_are_reviewers() {
        assert_eq!(
            allowed_roles(ChangeApplicationStatus),
            vec![Role::Staff, Role::Officer]
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_role() -> impl Strategy<Value = Option<Role>> {
            prop_oneof![Just(C), Just(S), Just(O), Just(A)]
        }

        fn any_operation() -> impl Strategy<Value = Operation> {
            proptest::sample::select(Operation::ALL.to_vec())
        }

        proptest! {
            /// Property: `authorize` agrees with `is_allowed` and never mixes up
            /// authentication and authorization failures.
            #[test]
            fn authorize_agrees_with_table(role in any_role(), op in any_operation()) {
                match authorize(role, op) {
                    Ok(()) => prop_assert!(is_allowed(role, op)),
                    Err(AuthzError::Unauthenticated(_)) => prop_assert!(role.is_none()),
                    Err(AuthzError::Forbidden { role: r, .. }) => prop_assert_eq!(Some(r), role),
                }
            }
        }
    }
}
