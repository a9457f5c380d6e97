//! HTTP route handlers and router assembly.

pub mod analytics;
pub mod auth;
pub mod orders;
pub mod products;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Build the complete application router.
#[must_use]
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .nest("/api/auth", auth::routes().layer(auth_rate_limiter()))
        .nest(
            "/api/products",
            products::routes().layer(api_rate_limiter()),
        )
        .nest("/api/orders", orders::routes().layer(api_rate_limiter()))
        .nest(
            "/api/analytics",
            analytics::routes().layer(api_rate_limiter()),
        )
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness check. Does not touch the store.
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Route not found" })),
    )
}
