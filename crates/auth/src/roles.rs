use core::str::FromStr;

use serde::{Deserialize, Serialize};

use civicdesk_core::DomainError;

/// Account role used by the authorization gate.
///
/// The set is closed: every operation in the gate table is decided for each
/// of these variants (plus the anonymous caller). `user` is the legacy wire
/// name for a citizen and is accepted on input only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(alias = "user")]
    Citizen,
    Staff,
    Officer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Citizen, Role::Staff, Role::Officer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Staff => "staff",
            Role::Officer => "officer",
        }
    }

    /// Staff and officers review applications; only they count as elevated.
    pub fn is_elevated(&self) -> bool {
        !matches!(self, Role::Citizen)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "citizen" | "user" => Ok(Role::Citizen),
            "staff" => Ok(Role::Staff),
            "officer" => Ok(Role::Officer),
            other => Err(DomainError::validation(format!(
                "role must be one of: citizen, staff, officer (got '{other}')"
            ))),
        }
    }
}
