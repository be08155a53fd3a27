//! Registration input rules and role-assignment policy.

use serde::{Deserialize, Serialize};

use civicdesk_auth::Role;
use civicdesk_core::{DomainError, DomainResult};

use crate::{DisplayName, EmailAddress};

/// Validated registration request (credential still in plaintext; the
/// orchestration layer hashes it before anything is stored).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub display_name: DisplayName,
    pub email: EmailAddress,
    pub credential: String,
    pub requested_role: Option<Role>,
}

impl Registration {
    pub fn parse(
        display_name: &str,
        email: &str,
        credential: &str,
        requested_role: Option<Role>,
    ) -> DomainResult<Self> {
        let display_name = DisplayName::parse(display_name)?;
        let email = EmailAddress::parse(email)?;
        if credential.is_empty() {
            return Err(DomainError::validation("credential is required"));
        }

        Ok(Self {
            display_name,
            email,
            credential: credential.to_string(),
            requested_role,
        })
    }
}

/// Who may pick a role at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationPolicy {
    /// The requested role is trusted verbatim (legacy portal behavior).
    Open,
    /// Anonymous registrants become citizens; elevated roles may only be
    /// granted by an authenticated officer.
    #[default]
    Privileged,
}

impl RegistrationPolicy {
    /// Resolve the role a new account receives.
    ///
    /// `registrar` is the role of the authenticated caller performing the
    /// registration, if any.
    pub fn resolve_role(&self, requested: Option<Role>, registrar: Option<Role>) -> DomainResult<Role> {
        let requested = requested.unwrap_or_default();
        match self {
            RegistrationPolicy::Open => Ok(requested),
            RegistrationPolicy::Privileged => {
                if !requested.is_elevated() || registrar == Some(Role::Officer) {
                    Ok(requested)
                } else {
                    Err(DomainError::unauthorized(format!(
                        "assigning role '{requested}' requires an officer"
                    )))
                }
            }
        }
    }
}

impl core::str::FromStr for RegistrationPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(RegistrationPolicy::Open),
            "privileged" => Ok(RegistrationPolicy::Privileged),
            other => Err(DomainError::validation(format!(
                "registration policy must be 'open' or 'privileged' (got '{other}')"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_fields() {
        let reg = Registration::parse(" alice ", "A@X.com", "pw", None).unwrap();
        assert_eq!(reg.display_name.as_str(), "alice");
        assert_eq!(reg.email.as_str(), "a@x.com");
    }

    #[test]
    fn empty_credential_is_rejected() {
        assert!(matches!(
            Registration::parse("alice", "a@x.com", "", None),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn open_policy_trusts_requested_role() {
        let role = RegistrationPolicy::Open
            .resolve_role(Some(Role::Officer), None)
            .unwrap();
        assert_eq!(role, Role::Officer);
    }

    #[test]
    fn missing_role_defaults_to_citizen() {
        for policy in [RegistrationPolicy::Open, RegistrationPolicy::Privileged] {
            assert_eq!(policy.resolve_role(None, None).unwrap(), Role::Citizen);
        }
    }

    #[test]
    fn privileged_policy_blocks_self_elevation() {
        let err = RegistrationPolicy::Privileged
            .resolve_role(Some(Role::Staff), None)
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));

        let err = RegistrationPolicy::Privileged
            .resolve_role(Some(Role::Officer), Some(Role::Staff))
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[test]
    fn officer_may_register_elevated_accounts() {
        let role = RegistrationPolicy::Privileged
            .resolve_role(Some(Role::Staff), Some(Role::Officer))
            .unwrap();
        assert_eq!(role, Role::Staff);
    }

    #[test]
    fn policy_parses_from_config_values() {
        assert_eq!("OPEN".parse::<RegistrationPolicy>().unwrap(), RegistrationPolicy::Open);
        assert!("closed".parse::<RegistrationPolicy>().is_err());
    }
}
