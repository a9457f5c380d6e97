//! JSON-file storage backend.
//!
//! The development fallback: each collection is one pretty-printed JSON array
//! file under the data directory, rewritten whole on every mutation. A single
//! async mutex serializes access so concurrent requests within one process
//! cannot lose updates. This store is not tuned for throughput.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::error::StoreError;
use super::filter::{self, FindOptions, SortOrder};

/// Flat-file backend storing one JSON array per collection.
pub struct JsonBackend {
    data_dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonBackend {
    /// Open the backend, creating the data directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub async fn open(data_dir: &Path) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(data_dir).await?;
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    fn file_path(&self, collection: &str) -> PathBuf {
        self.data_dir.join(format!("{collection}.json"))
    }

    /// Read a whole collection file. A missing file is an empty collection.
    async fn read_all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let path = self.file_path(collection);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Array(docs) => Ok(docs),
            _ => Err(StoreError::CorruptCollection(format!(
                "{} does not contain a JSON array",
                path.display()
            ))),
        }
    }

    async fn write_all(&self, collection: &str, docs: &[Value]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(docs)?;
        tokio::fs::write(self.file_path(collection), bytes).await?;
        Ok(())
    }

    /// Find all documents matching the filter, applying sort/skip/limit.
    pub async fn find_many(
        &self,
        collection: &str,
        query: &Map<String, Value>,
        options: &FindOptions,
    ) -> Result<Vec<Value>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut docs: Vec<Value> = self
            .read_all(collection)
            .await?
            .into_iter()
            .filter(|doc| filter::matches(query, doc))
            .collect();

        if let Some((field, order)) = &options.sort {
            docs.sort_by(|a, b| {
                let ordering = match (a.get(field.as_str()), b.get(field.as_str())) {
                    (Some(x), Some(y)) => {
                        filter::compare_values(x, y).unwrap_or(std::cmp::Ordering::Equal)
                    }
                    (Some(_), None) => std::cmp::Ordering::Greater,
                    (None, Some(_)) => std::cmp::Ordering::Less,
                    (None, None) => std::cmp::Ordering::Equal,
                };
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let skip = options.skip.unwrap_or(0);
        let mut docs: Vec<Value> = docs.into_iter().skip(skip).collect();
        if let Some(limit) = options.limit {
            docs.truncate(limit);
        }

        Ok(docs)
    }

    /// Find the first document matching the filter.
    pub async fn find_one(
        &self,
        collection: &str,
        query: &Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self
            .read_all(collection)
            .await?
            .into_iter()
            .find(|doc| filter::matches(query, doc)))
    }

    /// Append a document to the collection.
    pub async fn insert(&self, collection: &str, doc: Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut docs = self.read_all(collection).await?;
        docs.push(doc);
        self.write_all(collection, &docs).await
    }

    /// Apply a `$set`-style update to the first matching document and return
    /// the updated document.
    pub async fn update_first(
        &self,
        collection: &str,
        query: &Map<String, Value>,
        set: &Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut docs = self.read_all(collection).await?;

        let Some(doc) = docs.iter_mut().find(|doc| filter::matches(query, doc)) else {
            return Ok(None);
        };

        for (path, value) in set {
            set_path(doc, path, value.clone());
        }
        let updated = doc.clone();

        self.write_all(collection, &docs).await?;
        Ok(Some(updated))
    }

    /// Delete the first matching document. Returns whether one was removed.
    pub async fn delete_first(
        &self,
        collection: &str,
        query: &Map<String, Value>,
    ) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut docs = self.read_all(collection).await?;

        let Some(index) = docs.iter().position(|doc| filter::matches(query, doc)) else {
            return Ok(false);
        };

        docs.remove(index);
        self.write_all(collection, &docs).await?;
        Ok(true)
    }

    /// Count documents matching the filter.
    pub async fn count(
        &self,
        collection: &str,
        query: &Map<String, Value>,
    ) -> Result<u64, StoreError> {
        let _guard = self.lock.lock().await;
        let count = self
            .read_all(collection)
            .await?
            .iter()
            .filter(|doc| filter::matches(query, doc))
            .count();
        Ok(count as u64)
    }
}

/// Set a possibly-dotted path inside a document, creating intermediate
/// objects as MongoDB's `$set` does (e.g. `paymentDetails.paidAt`).
fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut current = doc;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return;
        };

        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }

        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::filter::Filter;
    use serde_json::json;

    async fn backend() -> (tempfile::TempDir, JsonBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonBackend::open(dir.path()).await.unwrap();
        (dir, backend)
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_collection() {
        let (_dir, backend) = backend().await;
        let docs = backend
            .find_many("products", Filter::all().as_map(), &FindOptions::default())
            .await
            .unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let (_dir, backend) = backend().await;
        backend
            .insert("products", json!({"id": "a", "name": "Honey", "price": 450}))
            .await
            .unwrap();
        backend
            .insert("products", json!({"id": "b", "name": "Apples", "price": 120}))
            .await
            .unwrap();

        let query = Filter::all().eq("id", "b");
        let found = backend
            .find_one("products", query.as_map())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["name"], "Apples");
    }

    #[tokio::test]
    async fn test_sort_skip_limit() {
        let (_dir, backend) = backend().await;
        for (id, price) in [("a", 30), ("b", 10), ("c", 20), ("d", 40)] {
            backend
                .insert("products", json!({"id": id, "price": price}))
                .await
                .unwrap();
        }

        let options = FindOptions::default().sort_asc("price").skip(1).limit(2);
        let docs = backend
            .find_many("products", Filter::all().as_map(), &options)
            .await
            .unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["c", "a"]);
    }

    #[tokio::test]
    async fn test_update_first_sets_dotted_path() {
        let (_dir, backend) = backend().await;
        backend
            .insert("orders", json!({"id": "o1", "paymentStatus": "pending"}))
            .await
            .unwrap();

        let query = Filter::all().eq("id", "o1");
        let mut set = Map::new();
        set.insert("paymentStatus".to_string(), json!("paid"));
        set.insert("paymentDetails.paidAt".to_string(), json!("2026-08-23T00:00:00Z"));

        let updated = backend
            .update_first("orders", query.as_map(), &set)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["paymentStatus"], "paid");
        assert_eq!(updated["paymentDetails"]["paidAt"], "2026-08-23T00:00:00Z");
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let (_dir, backend) = backend().await;
        let query = Filter::all().eq("id", "nope");
        let result = backend
            .update_first("orders", query.as_map(), &Map::new())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let (_dir, backend) = backend().await;
        backend.insert("users", json!({"id": "u1"})).await.unwrap();
        backend.insert("users", json!({"id": "u2"})).await.unwrap();

        assert_eq!(
            backend.count("users", Filter::all().as_map()).await.unwrap(),
            2
        );

        let query = Filter::all().eq("id", "u1");
        assert!(backend.delete_first("users", query.as_map()).await.unwrap());
        assert!(!backend.delete_first("users", query.as_map()).await.unwrap());
        assert_eq!(
            backend.count("users", Filter::all().as_map()).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let backend = JsonBackend::open(dir.path()).await.unwrap();
            backend.insert("users", json!({"id": "u1"})).await.unwrap();
        }
        let backend = JsonBackend::open(dir.path()).await.unwrap();
        assert_eq!(
            backend.count("users", Filter::all().as_map()).await.unwrap(),
            1
        );
    }
}
