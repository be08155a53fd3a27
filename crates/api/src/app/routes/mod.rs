use axum::Router;

pub mod applications;
pub mod auth;
pub mod services;
pub mod system;

/// Router for all `/api` endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/services", services::router())
        .nest("/applications", applications::router())
}
