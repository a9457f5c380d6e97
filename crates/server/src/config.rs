//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET` - Token signing secret (min 32 chars, no placeholder values)
//!
//! ## Optional
//! - `DB_TYPE` - Storage backend: `json` (default) or `mongodb`
//! - `MONGODB_URI` - MongoDB connection string (default: mongodb://localhost:27017)
//! - `MONGODB_DATABASE` - MongoDB database name (default: himorganic)
//! - `DATA_DIR` - Directory for JSON file storage (default: ./data)
//! - `HIMORGANIC_HOST` - Bind address (default: 127.0.0.1)
//! - `HIMORGANIC_PORT` - Listen port (default: 3000)
//! - `BCRYPT_COST` - bcrypt work factor (default: 10)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Access token lifetime in days.
pub const ACCESS_TOKEN_DAYS: i64 = 7;

/// Refresh token lifetime in days.
pub const REFRESH_TOKEN_DAYS: i64 = 30;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "change-in-production",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which storage backend the server persists to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Flat JSON files under a data directory (development fallback).
    Json {
        /// Directory holding one array file per collection.
        data_dir: PathBuf,
    },
    /// MongoDB document database.
    Mongo {
        /// Connection string (may contain credentials).
        uri: String,
        /// Database name.
        database: String,
    },
}

impl StorageConfig {
    /// Short label for startup logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Json { .. } => "json",
            Self::Mongo { .. } => "mongodb",
        }
    }
}

/// Himorganic server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Storage backend selection
    pub storage: StorageConfig,
    /// JWT signing secret
    pub jwt_secret: SecretString,
    /// bcrypt work factor for password hashing
    pub bcrypt_cost: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the JWT secret fails validation (length, placeholder detection).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("HIMORGANIC_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HIMORGANIC_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("HIMORGANIC_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("HIMORGANIC_PORT".to_string(), e.to_string()))?;

        let storage = storage_from_env()?;

        let jwt_secret = SecretString::from(get_required_env("JWT_SECRET")?);
        validate_jwt_secret(&jwt_secret, "JWT_SECRET")?;

        let bcrypt_cost = get_env_or_default("BCRYPT_COST", "10")
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar("BCRYPT_COST".to_string(), e.to_string()))?;

        Ok(Self {
            host,
            port,
            storage,
            jwt_secret,
            bcrypt_cost,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Resolve the storage backend from `DB_TYPE` and its companion variables.
fn storage_from_env() -> Result<StorageConfig, ConfigError> {
    match get_env_or_default("DB_TYPE", "json").as_str() {
        "json" => Ok(StorageConfig::Json {
            data_dir: PathBuf::from(get_env_or_default("DATA_DIR", "./data")),
        }),
        "mongodb" => Ok(StorageConfig::Mongo {
            uri: get_env_or_default("MONGODB_URI", "mongodb://localhost:27017"),
            database: get_env_or_default("MONGODB_DATABASE", "himorganic"),
        }),
        other => Err(ConfigError::InvalidEnvVar(
            "DB_TYPE".to_string(),
            format!("expected 'json' or 'mongodb', got '{other}'"),
        )),
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that the JWT secret meets minimum requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();

    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_JWT_SECRET_LENGTH} characters"),
        ));
    }

    let lower = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("contains placeholder pattern '{pattern}'"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_jwt_secret_too_short() {
        assert!(matches!(
            validate_jwt_secret(&secret("short"), "JWT_SECRET"),
            Err(ConfigError::InsecureSecret(..))
        ));
    }

    #[test]
    fn test_jwt_secret_placeholder_rejected() {
        assert!(matches!(
            validate_jwt_secret(
                &secret("himorganic-secret-key-change-in-production"),
                "JWT_SECRET"
            ),
            Err(ConfigError::InsecureSecret(..))
        ));
    }

    #[test]
    fn test_jwt_secret_accepted() {
        assert!(
            validate_jwt_secret(&secret("kJ8fQ2mN9xR4vT7wA3bC6dE1gH5iL0oPzUyWqS"), "JWT_SECRET")
                .is_ok()
        );
    }

    #[test]
    fn test_storage_kind_labels() {
        let json = StorageConfig::Json {
            data_dir: PathBuf::from("./data"),
        };
        assert_eq!(json.kind(), "json");

        let mongo = StorageConfig::Mongo {
            uri: "mongodb://localhost:27017".to_string(),
            database: "himorganic".to_string(),
        };
        assert_eq!(mongo.kind(), "mongodb");
    }
}
