//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
///
/// Both backends surface their failures through this one type so callers
/// never need to know which backend is active.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error from the JSON backend.
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// A document could not be serialized or deserialized.
    #[error("storage serialization error: {0}")]
    Serialization(String),

    /// MongoDB driver error.
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// A collection file holds something other than a JSON array.
    #[error("corrupt collection file: {0}")]
    CorruptCollection(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for StoreError {
    fn from(e: mongodb::bson::ser::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<mongodb::bson::de::Error> for StoreError {
    fn from(e: mongodb::bson::de::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
