use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

use civicdesk_auth::AuthzError;
use civicdesk_core::DomainError;
use civicdesk_infra::PortalError;

/// Every failure a handler can surface, mapped 1:1 to a status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl From<AuthzError> for ApiError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Unauthenticated(_) => ApiError::Unauthenticated(value.to_string()),
            AuthzError::Forbidden { .. } => ApiError::Forbidden(value.to_string()),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        ApiError::from(PortalError::from(value))
    }
}

impl From<PortalError> for ApiError {
    fn from(value: PortalError) -> Self {
        match value {
            PortalError::Validation(msg) => ApiError::Validation(msg),
            PortalError::Authentication(msg) => ApiError::Unauthenticated(msg),
            PortalError::Authorization(msg) => ApiError::Forbidden(msg),
            PortalError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            PortalError::Conflict(msg) => ApiError::Conflict(msg),
            PortalError::Store(e) => {
                tracing::error!(error = %e, "store failure");
                ApiError::Internal("storage failure".to_string())
            }
            PortalError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                ApiError::Internal("internal error".to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::Validation(value.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        json_error(status, code, self.to_string())
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path id, reporting garbage as a validation error.
pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portal_errors_map_to_status_codes() {
        let cases = [
            (PortalError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (PortalError::Authentication("x".into()), StatusCode::UNAUTHORIZED),
            (PortalError::Authorization("x".into()), StatusCode::FORBIDDEN),
            (PortalError::NotFound("service"), StatusCode::NOT_FOUND),
            (PortalError::Conflict("x".into()), StatusCode::CONFLICT),
            (PortalError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn garbage_id_is_a_validation_error() {
        let err = parse_id::<civicdesk_core::ServiceId>("not-a-uuid").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
