//! Analytics event model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use himorganic_core::EventId;

use crate::store::Entity;

/// A recorded analytics event with a freeform payload.
///
/// Events are append-only; nothing ever mutates or deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: EventId,
    /// Event name, e.g. `order_created`, `product_view`.
    pub event: String,
    #[serde(default)]
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    /// Record an event happening now.
    #[must_use]
    pub fn new(event: &str, data: Value) -> Self {
        let now = Utc::now();
        Self {
            id: EventId::generate(),
            event: event.to_string(),
            data,
            timestamp: now,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for AnalyticsEvent {
    const COLLECTION: &'static str = "analytics";

    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}
