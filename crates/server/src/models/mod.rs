//! Domain models persisted through the storage adapter.
//!
//! All models serialize in camelCase to match the public API wire format,
//! and every persisted type implements [`crate::store::Entity`] naming its
//! collection.

pub mod admin;
pub mod analytics;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use admin::Admin;
pub use analytics::AnalyticsEvent;
pub use order::{CustomerDetails, LineItem, Order, PaymentDetails, StatusChange};
pub use product::Product;
pub use session::Session;
pub use user::{PublicProfile, User};
