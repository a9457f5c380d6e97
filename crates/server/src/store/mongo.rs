//! MongoDB storage backend.
//!
//! Documents are stored with our own `id` field (a UUID string) as the
//! primary lookup key; MongoDB's auto-generated `_id` is stripped on the way
//! out so both backends return identical documents.

use mongodb::bson::{Document, doc};
use mongodb::options::ReturnDocument;
use mongodb::{Client, Database};
use serde_json::{Map, Value};

use super::error::StoreError;
use super::filter::{FindOptions, SortOrder};

/// MongoDB backend wrapping one database.
pub struct MongoBackend {
    db: Database,
}

impl MongoBackend {
    /// Connect to MongoDB and verify the connection with a ping.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Mongo`] if the URI is invalid or the server is
    /// unreachable.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        db.run_command(doc! {"ping": 1}).await?;
        Ok(Self { db })
    }

    fn coll(&self, collection: &str) -> mongodb::Collection<Document> {
        self.db.collection(collection)
    }

    /// Find all documents matching the filter, applying sort/skip/limit
    /// server-side.
    pub async fn find_many(
        &self,
        collection: &str,
        query: &Map<String, Value>,
        options: &FindOptions,
    ) -> Result<Vec<Value>, StoreError> {
        let coll = self.coll(collection);
        let mut find = coll.find(to_document(query)?);

        if let Some((field, order)) = &options.sort {
            let direction = match order {
                SortOrder::Asc => 1,
                SortOrder::Desc => -1,
            };
            find = find.sort(doc! {field.as_str(): direction});
        }
        if let Some(skip) = options.skip {
            find = find.skip(skip as u64);
        }
        if let Some(limit) = options.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let mut cursor = find.await?;
        let mut docs = Vec::new();
        while cursor.advance().await? {
            docs.push(to_json(cursor.deserialize_current()?)?);
        }
        Ok(docs)
    }

    /// Find the first document matching the filter.
    pub async fn find_one(
        &self,
        collection: &str,
        query: &Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let doc = self.coll(collection).find_one(to_document(query)?).await?;
        doc.map(to_json).transpose()
    }

    /// Insert a document into the collection.
    pub async fn insert(&self, collection: &str, doc: Value) -> Result<(), StoreError> {
        let doc = mongodb::bson::to_document(&doc)?;
        self.coll(collection).insert_one(doc).await?;
        Ok(())
    }

    /// Apply a `$set` update to the first matching document and return the
    /// updated document.
    pub async fn update_first(
        &self,
        collection: &str,
        query: &Map<String, Value>,
        set: &Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let update = doc! {"$set": to_document(set)?};
        let doc = self
            .coll(collection)
            .find_one_and_update(to_document(query)?, update)
            .return_document(ReturnDocument::After)
            .await?;
        doc.map(to_json).transpose()
    }

    /// Delete the first matching document. Returns whether one was removed.
    pub async fn delete_first(
        &self,
        collection: &str,
        query: &Map<String, Value>,
    ) -> Result<bool, StoreError> {
        let result = self
            .coll(collection)
            .delete_one(to_document(query)?)
            .await?;
        Ok(result.deleted_count > 0)
    }

    /// Count documents matching the filter.
    pub async fn count(
        &self,
        collection: &str,
        query: &Map<String, Value>,
    ) -> Result<u64, StoreError> {
        Ok(self
            .coll(collection)
            .count_documents(to_document(query)?)
            .await?)
    }
}

fn to_document(map: &Map<String, Value>) -> Result<Document, StoreError> {
    Ok(mongodb::bson::to_document(map)?)
}

fn to_json(mut doc: Document) -> Result<Value, StoreError> {
    // The driver assigns an ObjectId `_id` on insert; our documents carry
    // their own `id` field, so drop it before handing documents back.
    doc.remove("_id");
    Ok(serde_json::to_value(&doc)?)
}
