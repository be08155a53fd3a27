//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (stores, hasher, portal)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON response mapping
//! - `errors.rs`: consistent error envelopes

use std::sync::Arc;

use axum::http::{header, Method};
use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::StartupError;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> Result<Router, StartupError> {
    let services = Arc::new(services::build_services(config).await?);
    let auth_state = middleware::AuthState {
        jwt: services.jwt.clone(),
    };

    // Every /api route sees a resolved `RequestCaller`; handlers gate per operation.
    let api = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(cors_layer(config)),
        ))
}

/// Browser access for the portal front end. No configured origin means any origin.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = if config.frontend_origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(config.frontend_origins.clone())
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
