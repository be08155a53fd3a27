use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use civicdesk_auth::{Operation, Role};
use civicdesk_identity::Registration;

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::RequestCaller;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestCaller>,
    body: Result<Json<dto::RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let registrar = authz::require(&caller, Operation::Register)?;
    let Json(body) = body?;

    let requested_role = body
        .role
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .map(str::parse::<Role>)
        .transpose()?;
    let registration = Registration::parse(&body.display_name, &body.email, &body.credential, requested_role)?;

    let account = services.portal.register(registration, registrar).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "registration successful",
            "user": dto::user_json(&account),
            "role": account.role.as_str(),
        })),
    )
        .into_response())
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestCaller>,
    body: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    authz::require(&caller, Operation::Login)?;
    let Json(body) = body?;

    let outcome = services.portal.login(&body.email, &body.credential).await?;

    Ok(Json(json!({
        "success": true,
        "message": "login successful",
        "token": outcome.token,
        "user": dto::user_json(&outcome.account),
        "role": outcome.account.role.as_str(),
    }))
    .into_response())
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<RequestCaller>,
) -> Result<Response, ApiError> {
    let principal = authz::require_principal(&caller, Operation::ViewOwnProfile)?;
    let account = services.portal.profile(principal).await?;

    Ok(Json(json!({
        "success": true,
        "user": dto::user_json(&account),
        "role": account.role.as_str(),
    }))
    .into_response())
}
