use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use civicdesk_auth::Operation;
use civicdesk_catalog::{ServiceDraft, ServicePatch};
use civicdesk_core::ServiceId;

use crate::app::dto;
use crate::app::errors::{parse_id, ApiError};
use crate::app::services::AppServices;
use crate::authz;
use crate::context::RequestCaller;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_services).post(create_service))
        .route(
            "/:id",
            get(get_service).put(update_service).delete(delete_service),
        )
}

pub async fn list_services(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestCaller>,
) -> Result<Response, ApiError> {
    authz::require(&caller, Operation::ListServices)?;

    let all = services.portal.list_services().await?;
    Ok(Json(json!({
        "success": true,
        "count": all.len(),
        "services": all.iter().map(dto::service_json).collect::<Vec<_>>(),
    }))
    .into_response())
}

pub async fn get_service(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestCaller>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    authz::require(&caller, Operation::ListServices)?;
    let id: ServiceId = parse_id(&id)?;

    let service = services.portal.get_service(id).await?;
    Ok(Json(json!({ "success": true, "service": dto::service_json(&service) })).into_response())
}

pub async fn create_service(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestCaller>,
    body: Result<Json<ServiceDraft>, JsonRejection>,
) -> Result<Response, ApiError> {
    let principal = authz::require_principal(&caller, Operation::CreateService)?;
    let Json(draft) = body?;

    let service = services.portal.create_service(principal, draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "service": dto::service_json(&service) })),
    )
        .into_response())
}

pub async fn update_service(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestCaller>,
    Path(id): Path<String>,
    body: Result<Json<ServicePatch>, JsonRejection>,
) -> Result<Response, ApiError> {
    let principal = authz::require_principal(&caller, Operation::UpdateService)?;
    let id: ServiceId = parse_id(&id)?;
    let Json(patch) = body?;

    let service = services.portal.update_service(principal, id, patch).await?;
    Ok(Json(json!({ "success": true, "service": dto::service_json(&service) })).into_response())
}

pub async fn delete_service(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestCaller>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let principal = authz::require_principal(&caller, Operation::DeleteService)?;
    let id: ServiceId = parse_id(&id)?;

    services.portal.delete_service(principal, id).await?;
    Ok(Json(json!({ "success": true, "message": "service deleted" })).into_response())
}
