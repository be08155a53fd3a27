use core::str::FromStr;

use serde::{Deserialize, Serialize};

use civicdesk_core::DomainError;

/// Application status lifecycle.
///
/// Wire names are exact and case-sensitive (`Pending`, `Approved`, `Rejected`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 3] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Rejected => "Rejected",
        }
    }

    /// Approved and Rejected are decisions; Pending awaits review.
    pub fn is_decision(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

impl core::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "invalid status '{s}' (expected one of: Pending, Approved, Rejected)"
                ))
            })
    }
}
