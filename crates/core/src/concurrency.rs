//! Optimistic concurrency expectations for versioned writes.

use crate::error::{DomainError, DomainResult};

/// Expectation checked against a record's write counter before it is replaced.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ExpectedVersion {
    /// Skip version checking (last write wins).
    #[default]
    Any,
    /// Require the stored record to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn from_option(version: Option<u64>) -> Self {
        match version {
            Some(v) => ExpectedVersion::Exact(v),
            None => ExpectedVersion::Any,
        }
    }

    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "stale write rejected (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}
