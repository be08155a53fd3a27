use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::debug;

use civicdesk_auth::{JwtValidator, Principal, TokenValidationError};

use crate::context::RequestCaller;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Resolve the caller from `Authorization: Bearer <token>`.
///
/// Never rejects the request itself; handlers decide per operation whether
/// an anonymous or rejected caller may proceed.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let caller = match extract_bearer(req.headers()) {
        Bearer::Absent => RequestCaller::Anonymous,
        Bearer::Malformed => {
            RequestCaller::Rejected(TokenValidationError::Malformed("expected 'Bearer <token>'".to_string()))
        }
        Bearer::Token(token) => match state.jwt.validate(token, Utc::now()) {
            Ok(claims) => RequestCaller::Verified(Principal::from(claims)),
            Err(e) => {
                debug!(error = %e, "bearer assertion rejected");
                RequestCaller::Rejected(e)
            }
        },
    };

    req.extensions_mut().insert(caller);
    next.run(req).await
}

enum Bearer<'a> {
    Absent,
    Malformed,
    Token(&'a str),
}

fn extract_bearer(headers: &HeaderMap) -> Bearer<'_> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Bearer::Absent;
    };

    let Ok(header) = header.to_str() else {
        return Bearer::Malformed;
    };

    let Some(token) = header.strip_prefix("Bearer ") else {
        return Bearer::Malformed;
    };

    let token = token.trim();
    if token.is_empty() {
        return Bearer::Malformed;
    }

    Bearer::Token(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert!(matches!(extract_bearer(&HeaderMap::new()), Bearer::Absent));
    }

    #[test]
    fn non_bearer_scheme_is_malformed() {
        assert!(matches!(extract_bearer(&headers("Basic abc")), Bearer::Malformed));
        assert!(matches!(extract_bearer(&headers("Bearer   ")), Bearer::Malformed));
    }

    #[test]
    fn bearer_token_is_trimmed() {
        assert!(matches!(extract_bearer(&headers("Bearer abc.def ")), Bearer::Token("abc.def")));
    }
}
