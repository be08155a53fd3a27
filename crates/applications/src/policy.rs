use serde::{Deserialize, Serialize};

use civicdesk_core::{DomainError, DomainResult};

use crate::ApplicationStatus;

/// Which status changes a reviewer may make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Any status may move to any status, including back to Pending.
    #[default]
    Free,
    /// Approved and Rejected are final; only re-asserting the same decision
    /// is accepted.
    TerminalDecisions,
}

impl TransitionPolicy {
    pub fn permits(&self, from: ApplicationStatus, to: ApplicationStatus) -> bool {
        match self {
            TransitionPolicy::Free => true,
            TransitionPolicy::TerminalDecisions => !from.is_decision() || from == to,
        }
    }
}

impl core::str::FromStr for TransitionPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(TransitionPolicy::Free),
            "terminal" | "terminal_decisions" => Ok(TransitionPolicy::TerminalDecisions),
            other => Err(DomainError::validation(format!(
                "transition policy must be 'free' or 'terminal' (got '{other}')"
            ))),
        }
    }
}

/// Lifecycle rules applied by the portal.
///
/// The default reproduces the portal's long-standing behavior: free
/// transitions and no limit on repeated applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecyclePolicy {
    pub transitions: TransitionPolicy,
    pub allow_duplicate_applications: bool,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            transitions: TransitionPolicy::Free,
            allow_duplicate_applications: true,
        }
    }
}

impl LifecyclePolicy {
    /// Check a new submission given whether the applicant already has an
    /// application for the same service.
    pub fn check_submission(&self, already_applied: bool) -> DomainResult<()> {
        if already_applied && !self.allow_duplicate_applications {
            return Err(DomainError::conflict(
                "an application for this service already exists",
            ));
        }
        Ok(())
    }

    pub fn check_transition(&self, from: ApplicationStatus, to: ApplicationStatus) -> DomainResult<()> {
        if self.transitions.permits(from, to) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "application is {from}; decisions are final"
            )))
        }
    }
}
