use chrono::{DateTime, Utc};
use serde::Serialize;

use civicdesk_core::{AccountId, ApplicationId, DomainResult, ServiceId};

use crate::{ApplicationStatus, LifecyclePolicy};

/// Aggregate root: a citizen's application against a catalog service.
///
/// # Invariants
/// - A new application is always `Pending`, whatever the request said.
/// - `applicant` and `service` never change after submission.
/// - `version` starts at 1 and grows by one on every status write, including
///   writes that leave the status unchanged.
/// - Only the current status is kept; there is no transition history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub applicant: AccountId,
    pub service: ServiceId,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Application {
    /// Submit a new application on behalf of `applicant`.
    ///
    /// The caller guarantees `applicant` is the authenticated citizen and
    /// that `service` resolved to an existing definition.
    pub fn submit(
        id: ApplicationId,
        applicant: AccountId,
        service: ServiceId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            applicant,
            service,
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    /// Overwrite the status, refreshing `updated_at` even when the status is
    /// unchanged.
    pub fn set_status(
        &self,
        requested: ApplicationStatus,
        now: DateTime<Utc>,
        policy: &LifecyclePolicy,
    ) -> DomainResult<Self> {
        policy.check_transition(self.status, requested)?;

        Ok(Self {
            status: requested,
            updated_at: now,
            version: self.version + 1,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use civicdesk_core::DomainError;

    use super::*;
    use crate::TransitionPolicy;

    fn test_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn submitted() -> Application {
        Application::submit(ApplicationId::new(), AccountId::new(), ServiceId::new(), test_time())
    }

    #[test]
    fn submission_starts_pending_at_version_one() {
        let app = submitted();
        assert_eq!(app.status, ApplicationStatus::Pending);
        assert_eq!(app.version, 1);
        assert_eq!(app.created_at, app.updated_at);
    }

    #[test]
    fn approve_refreshes_timestamp_and_bumps_version() {
        let app = submitted();
        let later = test_time() + Duration::minutes(10);

        let approved = app
            .set_status(ApplicationStatus::Approved, later, &LifecyclePolicy::default())
            .unwrap();

        assert_eq!(approved.status, ApplicationStatus::Approved);
        assert_eq!(approved.updated_at, later);
        assert!(approved.updated_at > approved.created_at);
        assert_eq!(approved.version, 2);
        assert_eq!(approved.applicant, app.applicant);
        assert_eq!(approved.service, app.service);
    }

    #[test]
    fn self_transition_is_accepted_as_a_write() {
        let app = submitted();
        let later = test_time() + Duration::seconds(1);

        let same = app
            .set_status(ApplicationStatus::Pending, later, &LifecyclePolicy::default())
            .unwrap();

        assert_eq!(same.status, ApplicationStatus::Pending);
        assert_eq!(same.updated_at, later);
        assert_eq!(same.version, 2);
    }

    #[test]
    fn free_policy_allows_reopening_a_decision() {
        let policy = LifecyclePolicy::default();
        let rejected = submitted()
            .set_status(ApplicationStatus::Rejected, test_time(), &policy)
            .unwrap();
        let reopened = rejected
            .set_status(ApplicationStatus::Pending, test_time(), &policy)
            .unwrap();
        assert_eq!(reopened.status, ApplicationStatus::Pending);
    }

    #[test]
    fn terminal_policy_refuses_to_reopen() {
        let policy = LifecyclePolicy {
            transitions: TransitionPolicy::TerminalDecisions,
            ..LifecyclePolicy::default()
        };
        let approved = submitted()
            .set_status(ApplicationStatus::Approved, test_time(), &policy)
            .unwrap();

        let err = approved
            .set_status(ApplicationStatus::Pending, test_time(), &policy)
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn serializes_camel_case_fields() {
        let json = serde_json::to_value(submitted()).unwrap();
        assert_eq!(json["status"], "Pending");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_status() -> impl Strategy<Value = ApplicationStatus> {
            proptest::sample::select(ApplicationStatus::ALL.to_vec())
        }

        proptest! {
            /// Property: applying the same target twice leaves the status
            /// unchanged between calls; only `updated_at` and `version` move.
            #[test]
            fn set_status_is_effect_idempotent(
                start in any_status(),
                target in any_status(),
                gap in 1i64..10_000,
            ) {
                let policy = LifecyclePolicy::default();
                let app = submitted().set_status(start, test_time(), &policy).unwrap();

                let t1 = test_time() + Duration::seconds(gap);
                let t2 = t1 + Duration::seconds(gap);
                let once = app.set_status(target, t1, &policy).unwrap();
                let twice = once.set_status(target, t2, &policy).unwrap();

                prop_assert_eq!(once.status, target);
                prop_assert_eq!(twice.status, once.status);
                prop_assert_eq!(twice.updated_at, t2);
                prop_assert_eq!(twice.version, once.version + 1);
                prop_assert_eq!(twice.created_at, app.created_at);
            }
        }
    }
}
