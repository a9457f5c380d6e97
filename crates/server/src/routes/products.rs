//! Product catalog endpoints.
//!
//! Listing and fetching are public; mutations require an admin token.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use himorganic_core::AdminId;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::Product;
use crate::services::analytics;
use crate::state::AppState;
use crate::store::{Filter, FindOptions, Update};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_one).put(update).delete(delete_one))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    category: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    search: Option<String>,
    sort: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut filter = match query.search.as_deref() {
        Some(term) if !term.trim().is_empty() => {
            let pattern = regex::escape(term.trim());
            Filter::any([
                Filter::all().regex("name", &pattern, true),
                Filter::all().regex("description", &pattern, true),
            ])
        }
        _ => Filter::all(),
    };
    if let Some(category) = query.category.as_deref().filter(|c| *c != "all") {
        filter = filter.regex("category", &format!("^{}$", regex::escape(category)), true);
    }
    if let Some(min) = query.min_price {
        filter = filter.gte("price", min);
    }
    if let Some(max) = query.max_price {
        filter = filter.lte("price", max);
    }

    let options = match query.sort.as_deref() {
        Some("price_asc") => FindOptions::default().sort_asc("price"),
        Some("price_desc") => FindOptions::default().sort_desc("price"),
        Some("name_asc") => FindOptions::default().sort_asc("name"),
        _ => FindOptions::default().sort_desc("createdAt"),
    };

    let products = state
        .store()
        .collection::<Product>()
        .find_many(filter, options)
        .await?;
    Ok(Json(products))
}

async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let product = state
        .store()
        .collection::<Product>()
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let tracked = analytics::track(
        state.store(),
        "product_view",
        json!({ "productId": product.id, "name": product.name }),
    )
    .await;
    if let Err(err) = tracked {
        tracing::warn!(error = %err, "failed to record product view");
    }

    Ok(Json(product))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateProductRequest {
    name: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
    image: Option<String>,
    category: Option<String>,
    stock: Option<u32>,
}

async fn create(
    State(state): State<AppState>,
    RequireAdmin(claims): RequireAdmin,
    Json(body): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = body
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Name and price are required".to_string()))?;
    let price = body
        .price
        .ok_or_else(|| AppError::Validation("Name and price are required".to_string()))?;
    if price < Decimal::ZERO {
        return Err(AppError::Validation("Price cannot be negative".to_string()));
    }

    let mut product = Product::new(name.trim().to_string(), price, Some(AdminId::from(claims.sub)));
    if let Some(description) = body.description {
        product.description = description;
    }
    if let Some(image) = body.image {
        product.image = image;
    }
    if let Some(category) = body.category {
        product.category = category;
    }
    if let Some(stock) = body.stock {
        product.stock = stock;
    }

    state.store().collection::<Product>().create(&product).await?;
    tracing::info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProductRequest {
    name: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
    image: Option<String>,
    category: Option<String>,
    stock: Option<u32>,
    rating: Option<f64>,
    review_count: Option<u32>,
}

async fn update(
    State(state): State<AppState>,
    RequireAdmin(_claims): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(price) = body.price
        && price < Decimal::ZERO
    {
        return Err(AppError::Validation("Price cannot be negative".to_string()));
    }

    let mut changes = Update::default();
    if let Some(name) = body.name {
        changes = changes.set("name", name);
    }
    if let Some(description) = body.description {
        changes = changes.set("description", description);
    }
    if let Some(price) = body.price {
        changes = changes.set("price", price);
    }
    if let Some(image) = body.image {
        changes = changes.set("image", image);
    }
    if let Some(category) = body.category {
        changes = changes.set("category", category);
    }
    if let Some(stock) = body.stock {
        changes = changes.set("stock", stock);
    }
    if let Some(rating) = body.rating {
        changes = changes.set("rating", rating);
    }
    if let Some(review_count) = body.review_count {
        changes = changes.set("reviewCount", review_count);
    }

    let products = state.store().collection::<Product>();
    let product = if changes.is_empty() {
        products.find_by_id(id).await?
    } else {
        products.update_by_id(id, changes).await?
    };
    let product = product.ok_or(AppError::NotFound("Product"))?;
    Ok(Json(product))
}

async fn delete_one(
    State(state): State<AppState>,
    RequireAdmin(_claims): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state
        .store()
        .collection::<Product>()
        .delete_by_id(id)
        .await?;
    if !deleted {
        return Err(AppError::NotFound("Product"));
    }
    tracing::info!(product_id = %id, "product deleted");
    Ok(Json(json!({ "message": "Product deleted" })))
}
