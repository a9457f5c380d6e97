//! Admin account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use himorganic_core::{AdminId, AdminRole, Email};

use crate::models::user::PublicProfile;
use crate::store::Entity;

/// An admin dashboard account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: AdminId,
    pub name: String,
    pub email: Email,
    /// bcrypt password hash, never returned to clients.
    pub password: String,
    pub role: AdminRole,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Admin {
    /// Create a new admin account.
    #[must_use]
    pub fn new(
        name: String,
        email: Email,
        password_hash: String,
        role: AdminRole,
        permissions: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AdminId::generate(),
            name,
            email,
            password: password_hash,
            role,
            permissions,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The full set of dashboard permissions, granted to the bootstrap admin.
    #[must_use]
    pub fn all_permissions() -> Vec<String> {
        ["products", "orders", "users", "analytics", "settings"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// The password-free view returned by the API.
    #[must_use]
    pub fn public(&self) -> PublicProfile {
        PublicProfile {
            id: self.id.as_uuid(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: None,
            role: Some(self.role),
            permissions: Some(self.permissions.clone()),
            last_login: self.last_login,
            created_at: self.created_at,
            is_admin: true,
        }
    }
}

impl Entity for Admin {
    const COLLECTION: &'static str = "admins";

    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }
}
