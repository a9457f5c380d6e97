//! Order endpoints: checkout, customer history, and admin management.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use himorganic_core::{AdminId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, UserId};

use crate::error::AppError;
use crate::middleware::{OptionalAuth, RequireAdmin, RequireAuth};
use crate::models::{CustomerDetails, Order};
use crate::services::analytics;
use crate::services::orders::{NewOrder, OrderItemRequest, OrderService};
use crate::state::AppState;
use crate::store::{Filter, FindOptions};

const DEFAULT_PAGE_SIZE: usize = 50;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list_all))
        .route("/my-orders", get(my_orders))
        .route("/{id}", get(get_one))
        .route("/{id}/status", patch(update_status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderRequest {
    items: Option<Vec<OrderItemRequest>>,
    customer: Option<CustomerInput>,
    #[serde(default)]
    payment_method: PaymentMethod,
}

/// Customer fields as submitted; required fields are checked by hand so a
/// missing one yields a 400 with a useful message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerInput {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    pincode: Option<String>,
}

impl CustomerInput {
    fn into_details(self) -> Result<CustomerDetails, AppError> {
        const REQUIRED: &str = "Customer name, email and address are required";
        let require = |value: Option<String>| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Validation(REQUIRED.to_string()))
        };
        Ok(CustomerDetails {
            name: require(self.name)?,
            email: require(self.email)?,
            address: require(self.address)?,
            phone: self.phone,
            city: self.city,
            state: self.state,
            pincode: self.pincode,
        })
    }
}

async fn create(
    State(state): State<AppState>,
    OptionalAuth(claims): OptionalAuth,
    Json(body): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let items = body
        .items
        .filter(|items| !items.is_empty())
        .ok_or_else(|| AppError::Validation("Order items are required".to_string()))?;
    let customer = body
        .customer
        .ok_or_else(|| AppError::Validation("Customer details are required".to_string()))?
        .into_details()?;

    let user_id = claims
        .filter(|c| !c.is_admin)
        .map(|c| UserId::from(c.sub));
    let order = OrderService::new(state.store())
        .place_order(
            NewOrder {
                items,
                customer,
                payment_method: body.payment_method,
            },
            user_id,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Order placed successfully", "order": order })),
    ))
}

async fn my_orders(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<impl IntoResponse, AppError> {
    let orders = state
        .store()
        .collection::<Order>()
        .find_many(
            Filter::all().eq("user", claims.sub),
            FindOptions::default().sort_desc("createdAt"),
        )
        .await?;
    Ok(Json(orders))
}

async fn get_one(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = state
        .store()
        .collection::<Order>()
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    let is_owner = order.user.is_some_and(|owner| owner.as_uuid() == claims.sub);
    if !claims.is_admin && !is_owner {
        return Err(AppError::Forbidden("Not authorized to view this order"));
    }
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllOrdersQuery {
    status: Option<String>,
    from: Option<String>,
    to: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AllOrdersResponse {
    orders: Vec<Order>,
    total: u64,
    limit: usize,
    offset: usize,
}

async fn list_all(
    State(state): State<AppState>,
    RequireAdmin(_claims): RequireAdmin,
    Query(query): Query<AllOrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut filter = Filter::all();
    if let Some(status) = query.status.as_deref() {
        let status: OrderStatus = parse_wire(status)
            .ok_or_else(|| AppError::Validation(format!("Invalid order status: {status}")))?;
        filter = filter.eq("status", status);
    }
    if let Some(from) = query.from.as_deref() {
        filter = filter.gte("createdAt", parse_date(from)?);
    }
    if let Some(to) = query.to.as_deref() {
        filter = filter.lte("createdAt", parse_date(to)?);
    }

    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let orders = state.store().collection::<Order>();
    let total = orders.count(filter.clone()).await?;
    let page = orders
        .find_many(
            filter,
            FindOptions::default()
                .sort_desc("createdAt")
                .skip(offset)
                .limit(limit),
        )
        .await?;
    Ok(Json(AllOrdersResponse {
        orders: page,
        total,
        limit,
        offset,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStatusRequest {
    status: Option<String>,
    payment_status: Option<String>,
    note: Option<String>,
}

async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = body
        .status
        .as_deref()
        .map(|s| {
            parse_wire::<OrderStatus>(s)
                .ok_or_else(|| AppError::Validation(format!("Invalid order status: {s}")))
        })
        .transpose()?;
    let payment_status = body
        .payment_status
        .as_deref()
        .map(|s| {
            parse_wire::<PaymentStatus>(s)
                .ok_or_else(|| AppError::Validation(format!("Invalid payment status: {s}")))
        })
        .transpose()?;

    let order = OrderService::new(state.store())
        .update_status(
            OrderId::from(id),
            status,
            payment_status,
            body.note,
            AdminId::from(claims.sub),
        )
        .await?;

    let tracked = analytics::track(
        state.store(),
        "order_status_updated",
        json!({ "orderId": order.id, "status": order.status }),
    )
    .await;
    if let Err(err) = tracked {
        tracing::warn!(error = %err, "failed to record status change event");
    }

    Ok(Json(json!({ "message": "Order updated", "order": order })))
}

/// Parse a snake_case wire label into its enum.
fn parse_wire<T: serde::de::DeserializeOwned>(label: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(label.to_string())).ok()
}

/// Accepts full RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_date(value: &str) -> Result<DateTime<Utc>, AppError> {
    if let Ok(ts) = value.parse::<DateTime<Utc>>() {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| AppError::Validation(format!("Invalid date: {value}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_labels() {
        assert_eq!(
            parse_wire::<OrderStatus>("out_for_delivery"),
            Some(OrderStatus::OutForDelivery)
        );
        assert_eq!(parse_wire::<OrderStatus>("teleported"), None);
        assert_eq!(
            parse_wire::<PaymentStatus>("refunded"),
            Some(PaymentStatus::Refunded)
        );
    }

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2026-08-01T00:00:00Z").is_ok());
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn test_parse_date_accepts_day_precision() {
        let parsed = parse_date("2026-08-01").unwrap();
        assert_eq!(parsed, parse_date("2026-08-01T00:00:00Z").unwrap());
        assert!(parse_date("2026-13-40").is_err());
    }
}
