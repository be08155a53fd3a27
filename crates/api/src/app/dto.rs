use serde::Deserialize;
use serde_json::{json, Value};

use civicdesk_applications::Application;
use civicdesk_catalog::ServiceDefinition;
use civicdesk_identity::Account;
use civicdesk_infra::ApplicationView;

// -------------------------
// Request DTOs
// -------------------------

/// Registration body. `userName` / `password` are accepted for older clients.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    #[serde(alias = "userName")]
    pub display_name: String,
    pub email: String,
    #[serde(alias = "password")]
    pub credential: String,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    pub email: String,
    #[serde(alias = "password")]
    pub credential: String,
}

/// Any applicant id in the body is ignored; the caller is the applicant.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateApplicationRequest {
    pub service_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub expected_version: Option<u64>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn user_json(account: &Account) -> Value {
    json!({
        "id": account.id.to_string(),
        "email": account.email.as_str(),
        "displayName": account.display_name.as_str(),
    })
}

pub fn service_json(service: &ServiceDefinition) -> Value {
    json!({
        "id": service.id.to_string(),
        "title": service.title,
        "description": service.description,
        "requiredDocuments": service.required_documents,
        "fee": service.fee,
        "createdBy": service.created_by.to_string(),
        "createdAt": service.created_at,
        "updatedAt": service.updated_at,
    })
}

pub fn application_json(application: &Application) -> Value {
    json!({
        "id": application.id.to_string(),
        "applicant": application.applicant.to_string(),
        "service": application.service.to_string(),
        "status": application.status.as_str(),
        "createdAt": application.created_at,
        "updatedAt": application.updated_at,
        "version": application.version,
    })
}

/// The citizen's view: the service is expanded, `null` once deleted.
pub fn own_application_json(view: &ApplicationView) -> Value {
    let mut value = application_json(&view.application);
    value["service"] = match &view.service {
        Some(service) => json!({
            "id": service.id.to_string(),
            "title": service.title,
            "description": service.description,
            "fee": service.fee,
        }),
        None => Value::Null,
    };
    value
}

/// The reviewer's view: applicant and service expanded.
pub fn assigned_application_json(view: &ApplicationView) -> Value {
    let mut value = application_json(&view.application);
    value["applicant"] = match &view.applicant {
        Some(account) => user_json(account),
        None => Value::Null,
    };
    value["service"] = match &view.service {
        Some(service) => json!({
            "id": service.id.to_string(),
            "title": service.title,
            "description": service.description,
        }),
        None => Value::Null,
    };
    value
}
