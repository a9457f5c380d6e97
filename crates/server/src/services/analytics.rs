//! Event tracking and admin reporting.
//!
//! Reports are folded in memory from full collection scans. That is fine at
//! this catalog's scale and keeps the aggregation identical on both storage
//! backends.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use himorganic_core::{OrderStatus, PaymentStatus};

use crate::models::{AnalyticsEvent, Order, Product, User};
use crate::store::{Filter, FindOptions, Store, StoreError};

/// Default number of events returned by [`events`].
pub const DEFAULT_EVENT_LIMIT: usize = 100;

const LOW_STOCK_THRESHOLD: u32 = 10;
const TOP_LIST_SIZE: usize = 5;

/// Record an analytics event. Callers treat failures as non-fatal.
///
/// # Errors
///
/// Returns [`StoreError`] if the event cannot be persisted.
pub async fn track(store: &Store, event: &str, data: Value) -> Result<(), StoreError> {
    store
        .collection::<AnalyticsEvent>()
        .create(&AnalyticsEvent::new(event, data))
        .await
}

/// Reporting window for the sales report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesPeriod {
    Days7,
    Days30,
    Days90,
    Year,
}

impl SalesPeriod {
    /// Parse a period label, defaulting to seven days for anything unknown.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label {
            "30d" => Self::Days30,
            "90d" => Self::Days90,
            "1y" => Self::Year,
            _ => Self::Days7,
        }
    }

    const fn days(self) -> i64 {
        match self {
            Self::Days7 => 7,
            Self::Days30 => 30,
            Self::Days90 => 90,
            Self::Year => 365,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub overview: Overview,
    pub today: PeriodStats,
    pub this_week: PeriodStats,
    pub this_month: PeriodStats,
    pub orders_by_status: BTreeMap<String, u64>,
    pub low_stock_products: Vec<LowStockProduct>,
    pub top_products: Vec<TopProduct>,
    pub recent_orders: Vec<Order>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_orders: u64,
    pub total_revenue: Decimal,
    pub total_products: u64,
    pub total_customers: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    pub orders: u64,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockProduct {
    pub id: Uuid,
    pub name: String,
    pub stock: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub sold: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub chart_data: Vec<SalesPoint>,
    pub summary: SalesSummary,
    pub category_breakdown: Vec<CategorySales>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesPoint {
    pub date: String,
    pub orders: u64,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_orders: u64,
    pub total_revenue: Decimal,
    pub average_order_value: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySales {
    pub category: String,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerReport {
    pub total_customers: u64,
    pub new_customers_this_month: u64,
    pub top_customers: Vec<TopCustomer>,
    pub registrations_by_month: Vec<MonthCount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub orders: u64,
    pub total_spent: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthCount {
    pub month: String,
    pub count: u64,
}

/// Whether an order's money counts towards revenue figures.
fn counts_for_revenue(order: &Order) -> bool {
    order.payment_status == PaymentStatus::Paid || order.status != OrderStatus::Cancelled
}

/// Build the admin dashboard snapshot.
///
/// # Errors
///
/// Returns [`StoreError`] on a storage failure.
pub async fn dashboard(store: &Store) -> Result<Dashboard, StoreError> {
    let orders = store
        .collection::<Order>()
        .find_many(Filter::all(), FindOptions::default().sort_desc("createdAt"))
        .await?;
    let products = store
        .collection::<Product>()
        .find_many(Filter::all(), FindOptions::default())
        .await?;
    let total_customers = store.collection::<User>().count(Filter::all()).await?;

    let now = Utc::now();
    let today_start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(now, |t| t.and_utc());
    let week_start = now - Duration::days(7);
    let month_start = now - Duration::days(30);

    let total_revenue = orders
        .iter()
        .filter(|o| counts_for_revenue(o))
        .map(|o| o.total)
        .sum();

    let mut orders_by_status: BTreeMap<String, u64> = OrderStatus::ALL
        .iter()
        .filter_map(|s| serde_json::to_value(s).ok())
        .filter_map(|v| v.as_str().map(String::from))
        .map(|label| (label, 0))
        .collect();
    for order in &orders {
        if let Some(label) = serde_json::to_value(order.status)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
        {
            *orders_by_status.entry(label).or_insert(0) += 1;
        }
    }

    let mut sold: HashMap<Uuid, TopProduct> = HashMap::new();
    for order in &orders {
        for item in &order.items {
            let entry = sold
                .entry(item.product_id.as_uuid())
                .or_insert_with(|| TopProduct {
                    id: item.product_id.as_uuid(),
                    name: item.name.clone(),
                    image: item.image.clone(),
                    sold: 0,
                });
            entry.sold += u64::from(item.quantity);
        }
    }
    let mut top_products: Vec<TopProduct> = sold.into_values().collect();
    top_products.sort_by(|a, b| b.sold.cmp(&a.sold));
    top_products.truncate(TOP_LIST_SIZE);

    let mut low_stock: Vec<LowStockProduct> = products
        .iter()
        .filter(|p| p.stock < LOW_STOCK_THRESHOLD)
        .map(|p| LowStockProduct {
            id: p.id.as_uuid(),
            name: p.name.clone(),
            stock: p.stock,
        })
        .collect();
    low_stock.sort_by_key(|p| p.stock);
    low_stock.truncate(TOP_LIST_SIZE);

    let recent_orders = orders.iter().take(TOP_LIST_SIZE).cloned().collect();

    Ok(Dashboard {
        overview: Overview {
            total_orders: orders.len() as u64,
            total_revenue,
            total_products: products.len() as u64,
            total_customers,
        },
        today: period_stats(&orders, today_start),
        this_week: period_stats(&orders, week_start),
        this_month: period_stats(&orders, month_start),
        orders_by_status,
        low_stock_products: low_stock,
        top_products,
        recent_orders,
    })
}

fn period_stats(orders: &[Order], since: DateTime<Utc>) -> PeriodStats {
    let in_window = orders.iter().filter(|o| o.created_at >= since);
    let mut count = 0;
    let mut revenue = Decimal::ZERO;
    for order in in_window {
        count += 1;
        if counts_for_revenue(order) {
            revenue += order.total;
        }
    }
    PeriodStats {
        orders: count,
        revenue,
    }
}

/// Sales over a period, bucketed by day.
///
/// # Errors
///
/// Returns [`StoreError`] on a storage failure.
pub async fn sales(store: &Store, period: SalesPeriod) -> Result<SalesReport, StoreError> {
    let since = Utc::now() - Duration::days(period.days());
    let orders: Vec<Order> = store
        .collection::<Order>()
        .find_many(
            Filter::all().gte("createdAt", since),
            FindOptions::default().sort_asc("createdAt"),
        )
        .await?;
    let counted: Vec<&Order> = orders.iter().filter(|o| counts_for_revenue(o)).collect();

    let mut by_day: BTreeMap<String, SalesPoint> = BTreeMap::new();
    for order in &counted {
        let day = order.created_at.format("%Y-%m-%d").to_string();
        let point = by_day.entry(day.clone()).or_insert(SalesPoint {
            date: day,
            orders: 0,
            revenue: Decimal::ZERO,
        });
        point.orders += 1;
        point.revenue += order.total;
    }

    let total_orders = counted.len() as u64;
    let total_revenue: Decimal = counted.iter().map(|o| o.total).sum();
    let average_order_value = if total_orders == 0 {
        Decimal::ZERO
    } else {
        (total_revenue / Decimal::from(total_orders)).round_dp(2)
    };

    // Line items only carry the product id, so join categories from the
    // catalog.
    let products = store
        .collection::<Product>()
        .find_many(Filter::all(), FindOptions::default())
        .await?;
    let categories: HashMap<Uuid, &str> = products
        .iter()
        .map(|p| (p.id.as_uuid(), p.category.as_str()))
        .collect();
    let mut by_category: BTreeMap<String, Decimal> = BTreeMap::new();
    for order in &counted {
        for item in &order.items {
            let category = categories
                .get(&item.product_id.as_uuid())
                .copied()
                .unwrap_or("Uncategorized");
            *by_category.entry(category.to_string()).or_default() += item.subtotal;
        }
    }
    let mut category_breakdown: Vec<CategorySales> = by_category
        .into_iter()
        .map(|(category, revenue)| CategorySales { category, revenue })
        .collect();
    category_breakdown.sort_by(|a, b| b.revenue.cmp(&a.revenue));

    Ok(SalesReport {
        chart_data: by_day.into_values().collect(),
        summary: SalesSummary {
            total_orders,
            total_revenue,
            average_order_value,
        },
        category_breakdown,
    })
}

/// Customer counts, top spenders, and registration trend.
///
/// # Errors
///
/// Returns [`StoreError`] on a storage failure.
pub async fn customers(store: &Store) -> Result<CustomerReport, StoreError> {
    let users = store
        .collection::<User>()
        .find_many(Filter::all(), FindOptions::default())
        .await?;
    let orders = store
        .collection::<Order>()
        .find_many(Filter::all(), FindOptions::default())
        .await?;

    let now = Utc::now();
    let month_start = now - Duration::days(30);
    let new_this_month = users.iter().filter(|u| u.created_at >= month_start).count() as u64;

    let mut spend: HashMap<Uuid, (u64, Decimal)> = HashMap::new();
    for order in &orders {
        if let Some(user_id) = order.user {
            let entry = spend.entry(user_id.as_uuid()).or_default();
            entry.0 += 1;
            if counts_for_revenue(order) {
                entry.1 += order.total;
            }
        }
    }
    let mut top_customers: Vec<TopCustomer> = users
        .iter()
        .filter_map(|user| {
            spend.get(&user.id.as_uuid()).map(|(count, total)| TopCustomer {
                id: user.id.as_uuid(),
                name: user.name.clone(),
                email: user.email.as_str().to_string(),
                orders: *count,
                total_spent: *total,
            })
        })
        .collect();
    top_customers.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));
    top_customers.truncate(TOP_LIST_SIZE);

    // Registration counts for the trailing twelve months, oldest first.
    let mut registrations_by_month = Vec::with_capacity(12);
    for offset in (0..12).rev() {
        let point = now - Duration::days(30 * offset);
        let month = format!("{:04}-{:02}", point.year(), point.month());
        let count = users
            .iter()
            .filter(|u| u.created_at.format("%Y-%m").to_string() == month)
            .count() as u64;
        registrations_by_month.push(MonthCount { month, count });
    }

    Ok(CustomerReport {
        total_customers: users.len() as u64,
        new_customers_this_month: new_this_month,
        top_customers,
        registrations_by_month,
    })
}

/// Raw event feed, newest first, optionally filtered by event name.
///
/// # Errors
///
/// Returns [`StoreError`] on a storage failure.
pub async fn events(
    store: &Store,
    event: Option<&str>,
    limit: usize,
) -> Result<Vec<AnalyticsEvent>, StoreError> {
    let filter = match event {
        Some(name) => Filter::all().eq("event", name),
        None => Filter::all(),
    };
    store
        .collection::<AnalyticsEvent>()
        .find_many(
            filter,
            FindOptions::default().sort_desc("timestamp").limit(limit),
        )
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::models::CustomerDetails;
    use crate::services::orders::{NewOrder, OrderItemRequest, OrderService};

    async fn setup() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig::Json {
            data_dir: dir.path().to_path_buf(),
        };
        let store = Store::open(&storage).await.unwrap();
        (dir, store)
    }

    async fn seed_order(store: &Store, price: i64, quantity: u32) -> Order {
        let mut product = Product::new("Wild Honey".to_string(), Decimal::from(price), None);
        product.stock = 100;
        store.collection::<Product>().create(&product).await.unwrap();
        OrderService::new(store)
            .place_order(
                NewOrder {
                    items: vec![OrderItemRequest {
                        product_id: product.id,
                        quantity,
                    }],
                    customer: CustomerDetails {
                        name: "Asha".to_string(),
                        email: "asha@example.com".to_string(),
                        phone: None,
                        address: "12 Hill Road".to_string(),
                        city: None,
                        state: None,
                        pincode: None,
                    },
                    payment_method: himorganic_core::PaymentMethod::Cod,
                },
                None,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_dashboard_totals() {
        let (_dir, store) = setup().await;
        seed_order(&store, 100, 2).await;
        seed_order(&store, 600, 1).await;

        let report = dashboard(&store).await.unwrap();
        assert_eq!(report.overview.total_orders, 2);
        // 250 (with shipping) + 600 (free shipping).
        assert_eq!(report.overview.total_revenue, Decimal::from(850));
        assert_eq!(report.today.orders, 2);
        assert_eq!(report.orders_by_status["pending"], 2);
        assert_eq!(report.orders_by_status["shipped"], 0);
        assert_eq!(report.recent_orders.len(), 2);
        assert_eq!(report.top_products[0].sold, 2);
    }

    #[tokio::test]
    async fn test_sales_report_buckets_and_average() {
        let (_dir, store) = setup().await;
        seed_order(&store, 100, 1).await;
        seed_order(&store, 100, 3).await;

        let report = sales(&store, SalesPeriod::Days7).await.unwrap();
        assert_eq!(report.summary.total_orders, 2);
        // 150 + 350, both within today's bucket.
        assert_eq!(report.summary.total_revenue, Decimal::from(500));
        assert_eq!(report.summary.average_order_value, Decimal::from(250));
        assert_eq!(report.chart_data.len(), 1);
        assert_eq!(report.chart_data[0].orders, 2);
        assert_eq!(report.category_breakdown[0].category, "General");
    }

    #[tokio::test]
    async fn test_events_filter_and_limit() {
        let (_dir, store) = setup().await;
        track(&store, "product_view", serde_json::json!({"n": 1}))
            .await
            .unwrap();
        track(&store, "product_view", serde_json::json!({"n": 2}))
            .await
            .unwrap();
        track(&store, "order_created", serde_json::json!({}))
            .await
            .unwrap();

        let views = events(&store, Some("product_view"), DEFAULT_EVENT_LIMIT)
            .await
            .unwrap();
        assert_eq!(views.len(), 2);

        let all = events(&store, None, 2).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_period_parse_defaults() {
        assert_eq!(SalesPeriod::parse("30d"), SalesPeriod::Days30);
        assert_eq!(SalesPeriod::parse("1y"), SalesPeriod::Year);
        assert_eq!(SalesPeriod::parse("bogus"), SalesPeriod::Days7);
    }
}
