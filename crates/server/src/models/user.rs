//! Customer account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use himorganic_core::{Email, OrderId, ProductId, UserId};

use crate::store::Entity;

/// A registered customer.
///
/// The `password` field holds the bcrypt hash and is stripped from every API
/// response via [`PublicProfile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    /// bcrypt password hash, never returned to clients.
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// IDs of orders placed while logged in.
    #[serde(default)]
    pub orders: Vec<OrderId>,
    #[serde(default)]
    pub wishlist: Vec<ProductId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const fn default_active() -> bool {
    true
}

impl User {
    /// Create a new user with a freshly hashed password.
    #[must_use]
    pub fn new(name: String, email: Email, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::generate(),
            name,
            email,
            password: password_hash,
            phone: None,
            orders: Vec::new(),
            wishlist: Vec::new(),
            last_login: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The password-free view returned by the API.
    #[must_use]
    pub fn public(&self) -> PublicProfile {
        PublicProfile {
            id: self.id.as_uuid(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: None,
            permissions: None,
            last_login: self.last_login,
            created_at: self.created_at,
            is_admin: false,
        }
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

/// Account view with credentials stripped, shared by users and admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
    pub email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<himorganic_core::AdminRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub is_admin: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_public_profile_has_no_password() {
        let user = User::new(
            "Asha".to_string(),
            Email::parse("asha@example.com").unwrap(),
            "$2b$10$fakehash".to_string(),
        );
        let json = serde_json::to_value(user.public()).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["isAdmin"], false);
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let user = User::new(
            "Asha".to_string(),
            Email::parse("asha@example.com").unwrap(),
            "hash".to_string(),
        );
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("isActive").is_some());
        assert!(json.get("created_at").is_none());
    }
}
