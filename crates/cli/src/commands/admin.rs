//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! hm-cli admin create -e admin@example.com -n "Admin Name" -p <password> -r super_admin
//! ```
//!
//! Storage configuration comes from the same environment variables as the
//! server (`DB_TYPE`, `DATA_DIR`, `MONGODB_URI`, ...).

use thiserror::Error;

use himorganic_core::{AdminRole, Email, EmailError};
use himorganic_server::config::{ConfigError, ServerConfig};
use himorganic_server::models::Admin;
use himorganic_server::store::{Filter, Store, StoreError};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid role: {0}. Valid roles: super_admin, admin, viewer")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Admin already exists with email: {0}")]
    AlreadyExists(String),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Create a new admin account.
///
/// Returns the new admin's id.
///
/// # Errors
///
/// Returns [`AdminError`] for a bad role or email, a duplicate account, or
/// a storage failure.
pub async fn create(
    email: &str,
    name: &str,
    password: &str,
    role: &str,
) -> Result<uuid::Uuid, AdminError> {
    dotenvy::dotenv().ok();

    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email)?;

    let config = ServerConfig::from_env()?;
    let store = Store::open(&config.storage).await?;
    let admins = store.collection::<Admin>();

    if admins
        .exists(Filter::all().eq("email", email.as_str()))
        .await?
    {
        return Err(AdminError::AlreadyExists(email.into_inner()));
    }

    let hash = bcrypt::hash(password, config.bcrypt_cost)?;
    let admin = Admin::new(
        name.to_owned(),
        email,
        hash,
        role,
        permissions_for(role),
    );
    admins.create(&admin).await?;

    tracing::info!(email = %admin.email, role = %role, "admin account created");
    Ok(admin.id.as_uuid())
}

/// Default permission grants per role.
fn permissions_for(role: AdminRole) -> Vec<String> {
    match role {
        AdminRole::SuperAdmin => Admin::all_permissions(),
        AdminRole::Admin => ["products", "orders", "users", "analytics"]
            .into_iter()
            .map(String::from)
            .collect(),
        AdminRole::Viewer => vec!["analytics".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions_by_role() {
        assert_eq!(permissions_for(AdminRole::SuperAdmin).len(), 5);
        assert!(!permissions_for(AdminRole::Admin).contains(&"settings".to_string()));
        assert_eq!(permissions_for(AdminRole::Viewer), vec!["analytics"]);
    }
}
