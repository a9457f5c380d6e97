//! Checkout and order management API tests.
//!
//! Run with: cargo test -p himorganic-integration-tests -- --ignored

use himorganic_integration_tests::{admin_token, base_url, client, create_product, register_user};
use serde_json::{Value, json};

fn order_body(product_id: &str, quantity: u32) -> Value {
    json!({
        "items": [{ "productId": product_id, "quantity": quantity }],
        "customer": {
            "name": "Test Customer",
            "email": "customer@test.himorganic.com",
            "address": "12 Hill Road",
        },
    })
}

#[tokio::test]
#[ignore = "Requires a running himorganic server"]
async fn test_guest_checkout_totals_and_stock() {
    let client = client();
    let admin = admin_token(&client).await;
    let product = create_product(&client, &admin, 100, 5).await;
    let id = product["id"].as_str().expect("missing id");

    let resp = client
        .post(format!("{}/api/orders", base_url()))
        .json(&order_body(id, 2))
        .send()
        .await
        .expect("create order failed");
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.expect("order not JSON");
    let order = &body["order"];
    assert_eq!(order["subtotal"], json!(200.0));
    assert_eq!(order["shipping"], json!(50.0));
    assert_eq!(order["total"], json!(250.0));
    assert_eq!(order["status"], "pending");
    assert!(order["orderNumber"].as_str().expect("missing orderNumber").starts_with("ORD-"));

    // Stock went 5 -> 3.
    let resp = client
        .get(format!("{}/api/products/{id}", base_url()))
        .send()
        .await
        .expect("get product failed");
    let fetched: Value = resp.json().await.expect("product not JSON");
    assert_eq!(fetched["stock"], json!(3));
}

#[tokio::test]
#[ignore = "Requires a running himorganic server"]
async fn test_insufficient_stock_does_not_mutate() {
    let client = client();
    let admin = admin_token(&client).await;
    let product = create_product(&client, &admin, 100, 5).await;
    let id = product["id"].as_str().expect("missing id");

    let resp = client
        .post(format!("{}/api/orders", base_url()))
        .json(&order_body(id, 10))
        .send()
        .await
        .expect("create order failed");
    assert_eq!(resp.status(), 400);

    let resp = client
        .get(format!("{}/api/products/{id}", base_url()))
        .send()
        .await
        .expect("get product failed");
    let fetched: Value = resp.json().await.expect("product not JSON");
    assert_eq!(fetched["stock"], json!(5));
}

#[tokio::test]
#[ignore = "Requires a running himorganic server"]
async fn test_my_orders_and_ownership() {
    let client = client();
    let admin = admin_token(&client).await;
    let product = create_product(&client, &admin, 600, 10).await;
    let id = product["id"].as_str().expect("missing id");
    let (_, user_token, _) = register_user(&client).await;

    let resp = client
        .post(format!("{}/api/orders", base_url()))
        .bearer_auth(&user_token)
        .json(&order_body(id, 1))
        .send()
        .await
        .expect("create order failed");
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.expect("order not JSON");
    let order_id = body["order"]["id"].as_str().expect("missing order id");
    // Above the free-shipping threshold.
    assert_eq!(body["order"]["shipping"], json!(0.0));

    let resp = client
        .get(format!("{}/api/orders/my-orders", base_url()))
        .bearer_auth(&user_token)
        .send()
        .await
        .expect("my-orders failed");
    assert_eq!(resp.status(), 200);
    let mine: Vec<Value> = resp.json().await.expect("orders not JSON");
    assert!(mine.iter().any(|o| o["id"] == order_id));

    // Another customer cannot read it; the admin can.
    let (_, other_token, _) = register_user(&client).await;
    let resp = client
        .get(format!("{}/api/orders/{order_id}", base_url()))
        .bearer_auth(&other_token)
        .send()
        .await
        .expect("get order failed");
    assert_eq!(resp.status(), 403);
    let resp = client
        .get(format!("{}/api/orders/{order_id}", base_url()))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("get order failed");
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
#[ignore = "Requires a running himorganic server"]
async fn test_admin_status_update() {
    let client = client();
    let admin = admin_token(&client).await;
    let product = create_product(&client, &admin, 100, 10).await;
    let id = product["id"].as_str().expect("missing id");

    let resp = client
        .post(format!("{}/api/orders", base_url()))
        .json(&order_body(id, 1))
        .send()
        .await
        .expect("create order failed");
    let body: Value = resp.json().await.expect("order not JSON");
    let order_id = body["order"]["id"].as_str().expect("missing order id");

    let resp = client
        .patch(format!("{}/api/orders/{order_id}/status", base_url()))
        .bearer_auth(&admin)
        .json(&json!({ "status": "shipped", "paymentStatus": "paid" }))
        .send()
        .await
        .expect("status update failed");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("order not JSON");
    assert_eq!(body["order"]["status"], "shipped");
    assert_eq!(body["order"]["paymentStatus"], "paid");
    assert!(body["order"]["paymentDetails"]["paidAt"].is_string());
    assert_eq!(
        body["order"]["statusHistory"]
            .as_array()
            .expect("missing history")
            .len(),
        2
    );

    // Bogus statuses are rejected.
    let resp = client
        .patch(format!("{}/api/orders/{order_id}/status", base_url()))
        .bearer_auth(&admin)
        .json(&json!({ "status": "teleported" }))
        .send()
        .await
        .expect("status update failed");
    assert_eq!(resp.status(), 400);
}
