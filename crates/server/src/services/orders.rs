//! Order placement and status management.

use std::collections::HashMap;

use axum::http::StatusCode;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use himorganic_core::{AdminId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId};

use crate::models::{CustomerDetails, LineItem, Order, PaymentDetails, Product, StatusChange, User};
use crate::services::analytics;
use crate::store::{Store, StoreError, Update};

/// Orders with a subtotal above this ship free.
const FREE_SHIPPING_THRESHOLD: i64 = 500;

/// Flat shipping rate below the free-shipping threshold.
const FLAT_SHIPPING_RATE: i64 = 50;

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order must contain at least one item")]
    Empty,

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    #[error("Insufficient stock for {0}")]
    InsufficientStock(String),

    #[error("Order not found")]
    OrderNotFound,

    #[error("Nothing to update")]
    NothingToUpdate,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OrderError {
    /// Map the error to an HTTP status code.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Empty | Self::InvalidQuantity | Self::InsufficientStock(_) | Self::NothingToUpdate => {
                StatusCode::BAD_REQUEST
            }
            Self::ProductNotFound(_) | Self::OrderNotFound => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// One requested line of a new order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A checkout request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub items: Vec<OrderItemRequest>,
    pub customer: CustomerDetails,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

/// Order service over the shared store.
pub struct OrderService<'a> {
    store: &'a Store,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Place an order.
    ///
    /// Every line is resolved and stock-checked before any stock is
    /// decremented, so a failing line leaves the catalog untouched. Line
    /// items snapshot the product name and unit price at order time.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError`] if any line names an unknown product, an
    /// invalid quantity, or more units than are in stock.
    pub async fn place_order(
        &self,
        request: NewOrder,
        user_id: Option<UserId>,
    ) -> Result<Order, OrderError> {
        if request.items.is_empty() {
            return Err(OrderError::Empty);
        }

        let products = self.store.collection::<Product>();

        // Validation pass: resolve every line and check stock across
        // duplicate lines for the same product.
        let mut resolved: Vec<(Product, u32)> = Vec::with_capacity(request.items.len());
        let mut remaining: HashMap<Uuid, u32> = HashMap::new();
        for item in &request.items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity);
            }
            let product = products
                .find_by_id(item.product_id)
                .await?
                .ok_or(OrderError::ProductNotFound(item.product_id))?;
            let left = remaining
                .entry(product.id.as_uuid())
                .or_insert(product.stock);
            *left = left
                .checked_sub(item.quantity)
                .ok_or_else(|| OrderError::InsufficientStock(product.name.clone()))?;
            resolved.push((product, item.quantity));
        }

        let items: Vec<LineItem> = resolved
            .iter()
            .map(|(product, quantity)| LineItem {
                product_id: product.id,
                name: product.name.clone(),
                price: product.price,
                quantity: *quantity,
                image: Some(product.image.clone()),
                subtotal: product.price * Decimal::from(*quantity),
            })
            .collect();
        let subtotal: Decimal = items.iter().map(|item| item.subtotal).sum();
        let shipping = shipping_for(subtotal);

        // All lines validated; now decrement stock.
        for (id, left) in &remaining {
            products
                .update_by_id(*id, Update::default().set("stock", *left))
                .await?;
        }

        let now = Utc::now();
        let order = Order {
            id: OrderId::generate(),
            order_number: Order::generate_order_number(now),
            user: user_id,
            items,
            customer: request.customer,
            subtotal,
            shipping,
            total: subtotal + shipping,
            payment_method: request.payment_method,
            payment_status: PaymentStatus::Pending,
            payment_details: None,
            status: OrderStatus::Pending,
            status_history: vec![StatusChange {
                status: OrderStatus::Pending,
                timestamp: now,
                note: Some("Order placed".to_string()),
                updated_by: None,
            }],
            created_at: now,
            updated_at: now,
        };
        self.store.collection::<Order>().create(&order).await?;
        tracing::info!(order = %order.order_number, total = %order.total, "order placed");

        if let Some(user_id) = user_id {
            self.append_to_user_orders(user_id, order.id).await?;
        }

        let tracked = analytics::track(
            self.store,
            "order_created",
            json!({
                "orderId": order.id,
                "orderNumber": order.order_number,
                "total": order.total,
                "items": order.items.len(),
            }),
        )
        .await;
        if let Err(err) = tracked {
            tracing::warn!(error = %err, "failed to record order analytics event");
        }

        Ok(order)
    }

    /// Apply an admin status patch, appending to the status history.
    ///
    /// Marking the payment as paid stamps `paymentDetails.paidAt`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::OrderNotFound`] for an unknown order and
    /// [`OrderError::NothingToUpdate`] when neither field is present.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: Option<OrderStatus>,
        payment_status: Option<PaymentStatus>,
        note: Option<String>,
        updated_by: AdminId,
    ) -> Result<Order, OrderError> {
        if status.is_none() && payment_status.is_none() {
            return Err(OrderError::NothingToUpdate);
        }

        let orders = self.store.collection::<Order>();
        let order = orders
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound)?;

        let mut update = Update::default();
        if let Some(status) = status {
            let mut history = order.status_history.clone();
            history.push(StatusChange {
                status,
                timestamp: Utc::now(),
                note,
                updated_by: Some(updated_by),
            });
            update = update.set("status", status).set("statusHistory", history);
        }
        if let Some(payment_status) = payment_status {
            update = update.set("paymentStatus", payment_status);
            if payment_status == PaymentStatus::Paid {
                update = update.set(
                    "paymentDetails",
                    PaymentDetails {
                        paid_at: Some(Utc::now()),
                    },
                );
            }
        }

        orders
            .update_by_id(order_id, update)
            .await?
            .ok_or(OrderError::OrderNotFound)
    }

    async fn append_to_user_orders(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<(), StoreError> {
        let users = self.store.collection::<User>();
        if let Some(user) = users.find_by_id(user_id).await? {
            let mut orders = user.orders;
            orders.push(order_id);
            users
                .update_by_id(user_id, Update::default().set("orders", orders))
                .await?;
        }
        Ok(())
    }
}

/// Shipping charge for a given subtotal.
#[must_use]
pub fn shipping_for(subtotal: Decimal) -> Decimal {
    if subtotal > Decimal::from(FREE_SHIPPING_THRESHOLD) {
        Decimal::ZERO
    } else {
        Decimal::from(FLAT_SHIPPING_RATE)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::store::Filter;
    use himorganic_core::Email;

    async fn setup() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig::Json {
            data_dir: dir.path().to_path_buf(),
        };
        let store = Store::open(&storage).await.unwrap();
        (dir, store)
    }

    async fn seed_product(store: &Store, name: &str, price: i64, stock: u32) -> Product {
        let mut product = Product::new(name.to_string(), Decimal::from(price), None);
        product.stock = stock;
        store.collection::<Product>().create(&product).await.unwrap();
        product
    }

    fn customer() -> CustomerDetails {
        CustomerDetails {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            phone: None,
            address: "12 Hill Road".to_string(),
            city: Some("Shimla".to_string()),
            state: None,
            pincode: None,
        }
    }

    fn request(items: Vec<OrderItemRequest>) -> NewOrder {
        NewOrder {
            items,
            customer: customer(),
            payment_method: PaymentMethod::Cod,
        }
    }

    #[tokio::test]
    async fn test_totals_and_stock_decrement() {
        let (_dir, store) = setup().await;
        let product = seed_product(&store, "Wild Honey", 100, 5).await;
        let service = OrderService::new(&store);

        let order = service
            .place_order(
                request(vec![OrderItemRequest {
                    product_id: product.id,
                    quantity: 2,
                }]),
                None,
            )
            .await
            .unwrap();

        assert_eq!(order.subtotal, Decimal::from(200));
        assert_eq!(order.shipping, Decimal::from(50));
        assert_eq!(order.total, Decimal::from(250));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert!(order.order_number.starts_with("ORD-"));

        let reloaded = store
            .collection::<Product>()
            .find_by_id(product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.stock, 3);
    }

    #[tokio::test]
    async fn test_free_shipping_above_threshold() {
        let (_dir, store) = setup().await;
        let product = seed_product(&store, "Gift Hamper", 501, 10).await;
        let service = OrderService::new(&store);

        let order = service
            .place_order(
                request(vec![OrderItemRequest {
                    product_id: product.id,
                    quantity: 1,
                }]),
                None,
            )
            .await
            .unwrap();
        assert_eq!(order.shipping, Decimal::ZERO);
        assert_eq!(order.total, Decimal::from(501));
    }

    #[tokio::test]
    async fn test_exactly_threshold_still_pays_shipping() {
        let (_dir, store) = setup().await;
        let product = seed_product(&store, "Apricot Oil", 500, 10).await;
        let service = OrderService::new(&store);

        let order = service
            .place_order(
                request(vec![OrderItemRequest {
                    product_id: product.id,
                    quantity: 1,
                }]),
                None,
            )
            .await
            .unwrap();
        assert_eq!(order.shipping, Decimal::from(50));
        assert_eq!(order.total, Decimal::from(550));
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_everything_untouched() {
        let (_dir, store) = setup().await;
        let honey = seed_product(&store, "Wild Honey", 100, 5).await;
        let jam = seed_product(&store, "Plum Jam", 80, 10).await;
        let service = OrderService::new(&store);

        // The jam line is fine on its own; the honey line fails. Nothing
        // may be decremented.
        let result = service
            .place_order(
                request(vec![
                    OrderItemRequest {
                        product_id: jam.id,
                        quantity: 3,
                    },
                    OrderItemRequest {
                        product_id: honey.id,
                        quantity: 10,
                    },
                ]),
                None,
            )
            .await;
        assert!(matches!(result, Err(OrderError::InsufficientStock(_))));

        let products = store.collection::<Product>();
        assert_eq!(products.find_by_id(jam.id).await.unwrap().unwrap().stock, 10);
        assert_eq!(products.find_by_id(honey.id).await.unwrap().unwrap().stock, 5);
        assert_eq!(
            store.collection::<Order>().count(Filter::all()).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_duplicate_lines_checked_against_combined_stock() {
        let (_dir, store) = setup().await;
        let honey = seed_product(&store, "Wild Honey", 100, 5).await;
        let service = OrderService::new(&store);

        let result = service
            .place_order(
                request(vec![
                    OrderItemRequest {
                        product_id: honey.id,
                        quantity: 3,
                    },
                    OrderItemRequest {
                        product_id: honey.id,
                        quantity: 3,
                    },
                ]),
                None,
            )
            .await;
        assert!(matches!(result, Err(OrderError::InsufficientStock(_))));
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let (_dir, store) = setup().await;
        let service = OrderService::new(&store);

        let result = service
            .place_order(
                request(vec![OrderItemRequest {
                    product_id: ProductId::generate(),
                    quantity: 1,
                }]),
                None,
            )
            .await;
        assert!(matches!(result, Err(OrderError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_and_zero_quantity_rejected() {
        let (_dir, store) = setup().await;
        let product = seed_product(&store, "Wild Honey", 100, 5).await;
        let service = OrderService::new(&store);

        assert!(matches!(
            service.place_order(request(vec![]), None).await,
            Err(OrderError::Empty)
        ));
        assert!(matches!(
            service
                .place_order(
                    request(vec![OrderItemRequest {
                        product_id: product.id,
                        quantity: 0,
                    }]),
                    None,
                )
                .await,
            Err(OrderError::InvalidQuantity)
        ));
    }

    #[tokio::test]
    async fn test_logged_in_order_recorded_on_user() {
        let (_dir, store) = setup().await;
        let product = seed_product(&store, "Wild Honey", 100, 5).await;
        let user = User::new(
            "Asha".to_string(),
            Email::parse("asha@example.com").unwrap(),
            "hash".to_string(),
        );
        store.collection::<User>().create(&user).await.unwrap();

        let order = OrderService::new(&store)
            .place_order(
                request(vec![OrderItemRequest {
                    product_id: product.id,
                    quantity: 1,
                }]),
                Some(user.id),
            )
            .await
            .unwrap();
        assert_eq!(order.user, Some(user.id));

        let reloaded = store
            .collection::<User>()
            .find_by_id(user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.orders, vec![order.id]);
    }

    #[tokio::test]
    async fn test_status_update_appends_history_and_paid_stamp() {
        let (_dir, store) = setup().await;
        let product = seed_product(&store, "Wild Honey", 100, 5).await;
        let service = OrderService::new(&store);
        let admin_id = AdminId::generate();

        let order = service
            .place_order(
                request(vec![OrderItemRequest {
                    product_id: product.id,
                    quantity: 1,
                }]),
                None,
            )
            .await
            .unwrap();

        let updated = service
            .update_status(
                order.id,
                Some(OrderStatus::Shipped),
                Some(PaymentStatus::Paid),
                Some("Dispatched".to_string()),
                admin_id,
            )
            .await
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Shipped);
        assert_eq!(updated.payment_status, PaymentStatus::Paid);
        assert_eq!(updated.status_history.len(), 2);
        assert_eq!(updated.status_history[1].status, OrderStatus::Shipped);
        assert_eq!(updated.status_history[1].updated_by, Some(admin_id));
        assert!(
            updated
                .payment_details
                .as_ref()
                .and_then(|d| d.paid_at)
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_status_update_requires_a_field() {
        let (_dir, store) = setup().await;
        let service = OrderService::new(&store);
        assert!(matches!(
            service
                .update_status(OrderId::generate(), None, None, None, AdminId::generate())
                .await,
            Err(OrderError::NothingToUpdate)
        ));
        assert!(matches!(
            service
                .update_status(
                    OrderId::generate(),
                    Some(OrderStatus::Shipped),
                    None,
                    None,
                    AdminId::generate()
                )
                .await,
            Err(OrderError::OrderNotFound)
        ));
    }
}
