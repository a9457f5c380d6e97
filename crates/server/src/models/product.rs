//! Catalog product model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use himorganic_core::{AdminId, ProductId};

use crate::store::Entity;

/// Fallback image used when a product is created without one.
pub const DEFAULT_IMAGE: &str = "https://images.unsplash.com/photo-1542838132-92c53300491e?w=400";

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub image: String,
    pub category: String,
    /// Units in stock; decremented at order creation, never negative.
    pub stock: u32,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<AdminId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a new product with catalog defaults.
    #[must_use]
    pub fn new(name: String, price: Decimal, created_by: Option<AdminId>) -> Self {
        let now = Utc::now();
        Self {
            id: ProductId::generate(),
            name,
            description: String::new(),
            price,
            image: DEFAULT_IMAGE.to_string(),
            category: "General".to_string(),
            stock: 100,
            rating: 0.0,
            review_count: 0,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Product {
    const COLLECTION: &'static str = "products";

    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}
