//! Storage adapter: uniform CRUD over JSON files or MongoDB.
//!
//! The backend is selected at startup from [`StorageConfig`]; everything
//! above this module is backend-agnostic. Queries are MongoDB-style
//! [`Filter`] documents that the Mongo backend executes server-side and the
//! JSON backend evaluates with an in-memory matcher, so controller code runs
//! unchanged against either store.
//!
//! ```rust,ignore
//! let products = store.collection::<Product>();
//! let cheap = products
//!     .find_many(
//!         Filter::all().lte("price", 100),
//!         FindOptions::default().sort_asc("price"),
//!     )
//!     .await?;
//! ```

pub mod error;
pub mod filter;
pub mod json;
pub mod mongo;

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::config::StorageConfig;

pub use error::StoreError;
pub use filter::{Filter, FindOptions, SortOrder, Update};
use json::JsonBackend;
use mongo::MongoBackend;

/// A storable document type.
///
/// Implementors are serialized whole into their collection; the `id` field
/// (a UUID string on the wire) is the primary key on both backends.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    /// Collection (or file) name this entity lives in.
    const COLLECTION: &'static str;

    /// The entity's primary key.
    fn id(&self) -> Uuid;
}

enum Backend {
    Json(JsonBackend),
    Mongo(MongoBackend),
}

/// Handle to the active storage backend.
///
/// Cheaply cloneable; all clones share one backend connection.
#[derive(Clone)]
pub struct Store {
    backend: Arc<Backend>,
}

impl Store {
    /// Open the backend named by the configuration.
    ///
    /// For JSON storage this creates the data directory; for MongoDB it
    /// connects and pings the server.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be initialized.
    pub async fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        let backend = match config {
            StorageConfig::Json { data_dir } => Backend::Json(JsonBackend::open(data_dir).await?),
            StorageConfig::Mongo { uri, database } => {
                Backend::Mongo(MongoBackend::connect(uri, database).await?)
            }
        };
        Ok(Self {
            backend: Arc::new(backend),
        })
    }

    /// Typed handle for an entity's collection.
    #[must_use]
    pub fn collection<T: Entity>(&self) -> Collection<T> {
        Collection {
            backend: Arc::clone(&self.backend),
            _marker: PhantomData,
        }
    }
}

/// Typed CRUD interface over one collection.
pub struct Collection<T> {
    backend: Arc<Backend>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> Collection<T> {
    /// Find an entity by its primary key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails or a stored document does
    /// not deserialize.
    pub async fn find_by_id(&self, id: impl Into<Uuid>) -> Result<Option<T>, StoreError> {
        self.find_one(Filter::all().eq("id", id.into())).await
    }

    /// Find the first entity matching the filter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend or deserialization failure.
    pub async fn find_one(&self, filter: Filter) -> Result<Option<T>, StoreError> {
        let doc = match &*self.backend {
            Backend::Json(b) => b.find_one(T::COLLECTION, filter.as_map()).await?,
            Backend::Mongo(b) => b.find_one(T::COLLECTION, filter.as_map()).await?,
        };
        doc.map(from_doc).transpose()
    }

    /// Find all entities matching the filter with sort/limit/skip applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend or deserialization failure.
    pub async fn find_many(
        &self,
        filter: Filter,
        options: FindOptions,
    ) -> Result<Vec<T>, StoreError> {
        let docs = match &*self.backend {
            Backend::Json(b) => b.find_many(T::COLLECTION, filter.as_map(), &options).await?,
            Backend::Mongo(b) => b.find_many(T::COLLECTION, filter.as_map(), &options).await?,
        };
        docs.into_iter().map(from_doc).collect()
    }

    /// Persist a new entity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the entity cannot be serialized or written.
    pub async fn create(&self, entity: &T) -> Result<(), StoreError> {
        let doc = serde_json::to_value(entity)?;
        match &*self.backend {
            Backend::Json(b) => b.insert(T::COLLECTION, doc).await,
            Backend::Mongo(b) => b.insert(T::COLLECTION, doc).await,
        }
    }

    /// Apply a `$set` update to the entity with the given id, returning the
    /// updated entity. `updatedAt` is refreshed automatically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend or deserialization failure.
    pub async fn update_by_id(
        &self,
        id: impl Into<Uuid>,
        update: Update,
    ) -> Result<Option<T>, StoreError> {
        self.update_one(Filter::all().eq("id", id.into()), update)
            .await
    }

    /// Apply a `$set` update to the first entity matching the filter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend or deserialization failure.
    pub async fn update_one(
        &self,
        filter: Filter,
        update: Update,
    ) -> Result<Option<T>, StoreError> {
        let update = update.set("updatedAt", Utc::now());
        let doc = match &*self.backend {
            Backend::Json(b) => {
                b.update_first(T::COLLECTION, filter.as_map(), update.as_map())
                    .await?
            }
            Backend::Mongo(b) => {
                b.update_first(T::COLLECTION, filter.as_map(), update.as_map())
                    .await?
            }
        };
        doc.map(from_doc).transpose()
    }

    /// Delete the entity with the given id. Returns whether one was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    pub async fn delete_by_id(&self, id: impl Into<Uuid>) -> Result<bool, StoreError> {
        self.delete_one(Filter::all().eq("id", id.into())).await
    }

    /// Delete the first entity matching the filter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    pub async fn delete_one(&self, filter: Filter) -> Result<bool, StoreError> {
        match &*self.backend {
            Backend::Json(b) => b.delete_first(T::COLLECTION, filter.as_map()).await,
            Backend::Mongo(b) => b.delete_first(T::COLLECTION, filter.as_map()).await,
        }
    }

    /// Count entities matching the filter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    pub async fn count(&self, filter: Filter) -> Result<u64, StoreError> {
        match &*self.backend {
            Backend::Json(b) => b.count(T::COLLECTION, filter.as_map()).await,
            Backend::Mongo(b) => b.count(T::COLLECTION, filter.as_map()).await,
        }
    }

    /// Whether any entity matches the filter.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on backend failure.
    pub async fn exists(&self, filter: Filter) -> Result<bool, StoreError> {
        Ok(self.find_one(filter).await?.is_some())
    }
}

fn from_doc<T: DeserializeOwned>(doc: Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(doc)?)
}
