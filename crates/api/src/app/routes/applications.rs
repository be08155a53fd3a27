use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use civicdesk_applications::ApplicationStatus;
use civicdesk_auth::Operation;
use civicdesk_core::{ApplicationId, ExpectedVersion, ServiceId};

use crate::app::dto;
use crate::app::errors::{parse_id, ApiError};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::RequestCaller;

pub fn router() -> Router {
    Router::new()
        .route("/", post(submit_application))
        .route("/my", get(my_applications))
        .route("/assigned", get(assigned_applications))
        .route("/:id", put(update_status))
}

pub async fn submit_application(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestCaller>,
    body: Result<Json<dto::CreateApplicationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let principal = authz::require_principal(&caller, Operation::SubmitApplication)?;
    let Json(body) = body?;
    let service: ServiceId = parse_id(&body.service_id)?;

    let app = services.portal.submit_application(principal, service).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "app": dto::application_json(&app) })),
    )
        .into_response())
}

pub async fn my_applications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestCaller>,
) -> Result<Response, ApiError> {
    let principal = authz::require_principal(&caller, Operation::ListOwnApplications)?;

    let apps = services.portal.my_applications(principal).await?;
    Ok(Json(json!({
        "success": true,
        "count": apps.len(),
        "apps": apps.iter().map(dto::own_application_json).collect::<Vec<_>>(),
    }))
    .into_response())
}

pub async fn assigned_applications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestCaller>,
) -> Result<Response, ApiError> {
    let principal = authz::require_principal(&caller, Operation::ListAllApplications)?;

    let apps = services.portal.all_applications(principal).await?;
    Ok(Json(json!({
        "success": true,
        "count": apps.len(),
        "apps": apps.iter().map(dto::assigned_application_json).collect::<Vec<_>>(),
    }))
    .into_response())
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestCaller>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateStatusRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let principal = authz::require_principal(&caller, Operation::ChangeApplicationStatus)?;
    let id: ApplicationId = parse_id(&id)?;
    let Json(body) = body?;
    let status: ApplicationStatus = body.status.parse()?;

    let app = services
        .portal
        .set_status(principal, id, status, ExpectedVersion::from_option(body.expected_version))
        .await?;
    Ok(Json(json!({ "success": true, "app": dto::application_json(&app) })).into_response())
}
