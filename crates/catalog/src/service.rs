use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use civicdesk_core::{AccountId, DomainError, DomainResult, ServiceId};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MIN_CHARS: usize = 10;

/// Input for a new service definition.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDraft {
    pub title: String,
    pub description: String,
    /// `null` reads as an empty list.
    #[serde(default, deserialize_with = "documents_or_empty")]
    pub required_documents: Vec<String>,
    /// Defaults to zero when omitted. Numeric strings such as `"50"` are accepted.
    #[serde(default, deserialize_with = "lenient_fee")]
    pub fee: Option<f64>,
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub required_documents: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_fee")]
    pub fee: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn lenient_fee<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(fee)) => Ok(Some(fee)),
        Some(NumberOrText::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("fee must be a number, got {text:?}"))),
    }
}

fn documents_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ServicePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.required_documents.is_none()
            && self.fee.is_none()
    }
}

/// A government service offering.
///
/// # Invariants
/// - `title` is 3–100 characters after trimming.
/// - `description` is at least 10 characters after trimming.
/// - `fee` is finite and non-negative.
/// - `required_documents` keeps caller order; entries are trimmed and non-blank.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    pub id: ServiceId,
    pub title: String,
    pub description: String,
    pub required_documents: Vec<String>,
    pub fee: f64,
    pub created_by: AccountId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceDefinition {
    /// Build and validate a new definition owned by `created_by`.
    pub fn create(
        id: ServiceId,
        draft: ServiceDraft,
        created_by: AccountId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let service = Self {
            id,
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            required_documents: normalize_documents(draft.required_documents),
            fee: draft.fee.unwrap_or(0.0),
            created_by,
            created_at: now,
            updated_at: now,
        };
        service.validate()?;
        Ok(service)
    }

    /// Merge `patch` over the current values and re-validate the result.
    ///
    /// Ownership and `created_at` never change.
    pub fn merge(&self, patch: ServicePatch, now: DateTime<Utc>) -> DomainResult<Self> {
        let merged = Self {
            id: self.id,
            title: patch
                .title
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| self.title.clone()),
            description: patch
                .description
                .map(|d| d.trim().to_string())
                .unwrap_or_else(|| self.description.clone()),
            required_documents: patch
                .required_documents
                .map(normalize_documents)
                .unwrap_or_else(|| self.required_documents.clone()),
            fee: patch.fee.unwrap_or(self.fee),
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: now,
        };
        merged.validate()?;
        Ok(merged)
    }

    fn validate(&self) -> DomainResult<()> {
        let title_len = self.title.chars().count();
        if title_len < TITLE_MIN_CHARS {
            return Err(DomainError::validation(format!(
                "title must be at least {TITLE_MIN_CHARS} characters long"
            )));
        }
        if title_len > TITLE_MAX_CHARS {
            return Err(DomainError::validation(format!(
                "title cannot exceed {TITLE_MAX_CHARS} characters"
            )));
        }
        if self.description.chars().count() < DESCRIPTION_MIN_CHARS {
            return Err(DomainError::validation(format!(
                "description must be at least {DESCRIPTION_MIN_CHARS} characters long"
            )));
        }
        if !self.fee.is_finite() {
            return Err(DomainError::validation("fee must be a number"));
        }
        if self.fee < 0.0 {
            return Err(DomainError::validation("fee cannot be negative"));
        }
        if self.required_documents.iter().any(|d| d.is_empty()) {
            return Err(DomainError::validation("required documents cannot be blank"));
        }
        Ok(())
    }
}

fn normalize_documents(documents: Vec<String>) -> Vec<String> {
    documents.into_iter().map(|d| d.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn birth_certificate() -> ServiceDraft {
        ServiceDraft {
            title: "Birth Certificate".to_string(),
            description: "Issue a birth certificate copy".to_string(),
            required_documents: vec!["Hospital record".to_string()],
            fee: Some(50.0),
        }
    }

    fn create(draft: ServiceDraft) -> DomainResult<ServiceDefinition> {
        ServiceDefinition::create(ServiceId::new(), draft, AccountId::new(), Utc::now())
    }

    #[test]
    fn create_valid_service() {
        let service = create(birth_certificate()).unwrap();
        assert_eq!(service.title, "Birth Certificate");
        assert_eq!(service.fee, 50.0);
        assert_eq!(service.created_at, service.updated_at);
    }

    #[test]
    fn fee_defaults_to_zero() {
        let service = create(ServiceDraft { fee: None, ..birth_certificate() }).unwrap();
        assert_eq!(service.fee, 0.0);
    }

    #[test]
    fn short_title_is_rejected() {
        let err = create(ServiceDraft { title: "ID".to_string(), ..birth_certificate() }).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("title")));
    }

    #[test]
    fn whitespace_does_not_count_towards_title_length() {
        assert!(create(ServiceDraft { title: "  ab  ".to_string(), ..birth_certificate() }).is_err());
    }

    #[test]
    fn title_over_limit_is_rejected() {
        let title = "t".repeat(TITLE_MAX_CHARS + 1);
        assert!(create(ServiceDraft { title, ..birth_certificate() }).is_err());
        let title = "t".repeat(TITLE_MAX_CHARS);
        assert!(create(ServiceDraft { title, ..birth_certificate() }).is_ok());
    }

    #[test]
    fn short_description_is_rejected() {
        let err = create(ServiceDraft { description: "too short".to_string(), ..birth_certificate() })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("description")));
    }

    #[test]
    fn negative_fee_is_rejected() {
        let err = create(ServiceDraft { fee: Some(-1.0), ..birth_certificate() }).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("fee")));
    }

    #[test]
    fn non_finite_fee_is_rejected() {
        assert!(create(ServiceDraft { fee: Some(f64::NAN), ..birth_certificate() }).is_err());
    }

    #[test]
    fn empty_document_list_is_allowed() {
        let service = create(ServiceDraft { required_documents: vec![], ..birth_certificate() }).unwrap();
        assert!(service.required_documents.is_empty());
    }

    #[test]
    fn merge_keeps_unspecified_fields() {
        let service = create(birth_certificate()).unwrap();
        let later = service.created_at + Duration::seconds(5);

        let merged = service
            .merge(ServicePatch { fee: Some(75.0), ..Default::default() }, later)
            .unwrap();

        assert_eq!(merged.fee, 75.0);
        assert_eq!(merged.title, service.title);
        assert_eq!(merged.required_documents, service.required_documents);
        assert_eq!(merged.created_at, service.created_at);
        assert_eq!(merged.updated_at, later);
    }

    #[test]
    fn merge_revalidates_merged_result() {
        let service = create(birth_certificate()).unwrap();
        let err = service
            .merge(ServicePatch { title: Some("x".to_string()), ..Default::default() }, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn draft_deserializes_camel_case() {
        let draft: ServiceDraft = serde_json::from_value(serde_json::json!({
            "title": "Passport",
            "description": "Issue a new passport booklet",
            "requiredDocuments": ["Photo", "Old passport"],
        }))
        .unwrap();
        assert_eq!(draft.required_documents.len(), 2);
        assert_eq!(draft.fee, None);
    }

    #[test]
    fn draft_accepts_null_documents_and_numeric_text_fee() {
        let draft: ServiceDraft = serde_json::from_value(serde_json::json!({
            "title": "Passport",
            "description": "Issue a new passport booklet",
            "requiredDocuments": null,
            "fee": " 50 ",
        }))
        .unwrap();
        assert!(draft.required_documents.is_empty());
        assert_eq!(draft.fee, Some(50.0));

        let service = create(draft).unwrap();
        assert_eq!(service.fee, 50.0);
    }

    #[test]
    fn non_numeric_fee_text_is_rejected() {
        let result = serde_json::from_value::<ServiceDraft>(serde_json::json!({
            "title": "Passport",
            "description": "Issue a new passport booklet",
            "fee": "fifty",
        }));
        assert!(result.unwrap_err().to_string().contains("fee must be a number"));
    }

    #[test]
    fn patch_fee_accepts_numeric_text() {
        let patch: ServicePatch = serde_json::from_value(serde_json::json!({ "fee": "12.5" })).unwrap();
        assert_eq!(patch.fee, Some(12.5));
        let patch: ServicePatch = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(patch.is_empty());
    }
}
