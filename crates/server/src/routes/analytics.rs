//! Admin analytics endpoints.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::services::analytics::{self, DEFAULT_EVENT_LIMIT, SalesPeriod};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/sales", get(sales))
        .route("/customers", get(customers))
        .route("/events", get(events))
}

async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(_claims): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(analytics::dashboard(state.store()).await?))
}

#[derive(Debug, Deserialize)]
struct SalesQuery {
    period: Option<String>,
}

async fn sales(
    State(state): State<AppState>,
    RequireAdmin(_claims): RequireAdmin,
    Query(query): Query<SalesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let period = SalesPeriod::parse(query.period.as_deref().unwrap_or("7d"));
    Ok(Json(analytics::sales(state.store(), period).await?))
}

async fn customers(
    State(state): State<AppState>,
    RequireAdmin(_claims): RequireAdmin,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(analytics::customers(state.store()).await?))
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    event: Option<String>,
    limit: Option<usize>,
}

async fn events(
    State(state): State<AppState>,
    RequireAdmin(_claims): RequireAdmin,
    Query(query): Query<EventsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    let feed = analytics::events(state.store(), query.event.as_deref(), limit).await?;
    Ok(Json(feed))
}
