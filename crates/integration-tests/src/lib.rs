//! Integration tests for Himorganic.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the server with a throwaway data directory
//! DATA_DIR=$(mktemp -d) JWT_SECRET=<a long random string> \
//!     cargo run -p himorganic-server
//!
//! # Run the ignored integration tests against it
//! cargo test -p himorganic-integration-tests -- --ignored
//! ```
//!
//! The tests talk to `http://localhost:3000` by default; set
//! `HIMORGANIC_BASE_URL` to point elsewhere. They assume the bootstrap
//! admin account exists (it is created automatically on an empty store).

use reqwest::Client;
use serde_json::{Value, json};

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("HIMORGANIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A plain HTTP client.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder().build().expect("Failed to create HTTP client")
}

/// Register a fresh user with a unique email; returns `(email, access, refresh)`.
///
/// # Panics
///
/// Panics if registration does not succeed.
pub async fn register_user(client: &Client) -> (String, String, String) {
    let email = format!("user-{}@test.himorganic.com", uuid::Uuid::new_v4());
    let resp = client
        .post(format!("{}/api/auth/register", base_url()))
        .json(&json!({
            "name": "Test User",
            "email": email,
            "password": "integration-pass",
        }))
        .send()
        .await
        .expect("register request failed");
    assert_eq!(resp.status(), 201, "registration should return 201");
    let body: Value = resp.json().await.expect("register response not JSON");
    (
        email,
        body["accessToken"].as_str().expect("missing accessToken").to_string(),
        body["refreshToken"].as_str().expect("missing refreshToken").to_string(),
    )
}

/// Log in as the bootstrap admin and return an access token.
///
/// # Panics
///
/// Panics if the admin login fails.
pub async fn admin_token(client: &Client) -> String {
    let resp = client
        .post(format!("{}/api/auth/admin/login", base_url()))
        .json(&json!({
            "email": "admin@himorganic.com",
            "password": "admin123",
        }))
        .send()
        .await
        .expect("admin login request failed");
    assert_eq!(resp.status(), 200, "admin login should succeed");
    let body: Value = resp.json().await.expect("admin login response not JSON");
    body["accessToken"]
        .as_str()
        .expect("missing accessToken")
        .to_string()
}

/// Create a product as admin; returns the product JSON.
///
/// # Panics
///
/// Panics if creation fails.
pub async fn create_product(client: &Client, token: &str, price: i64, stock: u32) -> Value {
    let resp = client
        .post(format!("{}/api/products", base_url()))
        .bearer_auth(token)
        .json(&json!({
            "name": format!("Test Product {}", uuid::Uuid::new_v4()),
            "price": price,
            "stock": stock,
            "category": "Test",
        }))
        .send()
        .await
        .expect("create product request failed");
    assert_eq!(resp.status(), 201, "product creation should return 201");
    resp.json().await.expect("product response not JSON")
}
