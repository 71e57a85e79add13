//! Document Store
//!
//! The narrow persistence seam the importer depends on. Documents are plain
//! BSON so the same repositories run against MongoDB and the in-memory store.

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument};
use mongodb::{Collection, IndexModel};
use tracing::{debug, info};

use spk_utils::{SpkError, SpkResult};

use crate::mongo::MongoDatabase;

pub const DUPLICATE_KEY: i32 = 11000;

/// Collection names.
pub mod collections {
    pub const WORK_ORDERS: &str = "work_orders";
    pub const CATEGORIES: &str = "categories";
    pub const SUB_CATEGORIES: &str = "sub_categories";
    pub const UNITS: &str = "units";
    pub const AREAS: &str = "areas";
    pub const WORK_ITEMS: &str = "work_items";
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(&self, collection: &str, filter: Document) -> SpkResult<Option<Document>>;

    /// Atomically returns the document matching `filter`, inserting
    /// `candidate` when there is none. The flag is true when `candidate`
    /// was inserted.
    async fn find_or_insert(
        &self,
        collection: &str,
        filter: Document,
        candidate: Document,
    ) -> SpkResult<(Document, bool)>;

    /// Plain insert. A unique index violation is a `Conflict`.
    async fn insert_one(&self, collection: &str, document: Document) -> SpkResult<()>;

    async fn ensure_unique_index(&self, collection: &str, keys: &[&str]) -> SpkResult<()>;

    async fn ensure_geo_index(&self, _collection: &str, _field: &str) -> SpkResult<()> {
        Ok(())
    }

    async fn count(&self, collection: &str, filter: Document) -> SpkResult<u64>;
}

/// MongoDB-backed store.
#[derive(Clone)]
pub struct MongoStore {
    db: MongoDatabase,
}

impl MongoStore {
    pub fn new(db: MongoDatabase) -> Self {
        Self { db }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

pub fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_one(&self, collection: &str, filter: Document) -> SpkResult<Option<Document>> {
        Ok(self.collection(collection).find_one(filter, None).await?)
    }

    async fn find_or_insert(
        &self,
        collection: &str,
        filter: Document,
        candidate: Document,
    ) -> SpkResult<(Document, bool)> {
        let candidate_id = candidate.get("_id").cloned();
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let result = self
            .collection(collection)
            .find_one_and_update(filter.clone(), mongodb::bson::doc! { "$setOnInsert": candidate }, options)
            .await;

        match result {
            Ok(Some(document)) => {
                let created = candidate_id.is_some() && document.get("_id") == candidate_id.as_ref();
                Ok((document, created))
            }
            Ok(None) => Err(SpkError::database(format!("Upsert into {} returned no document", collection))),
            Err(e) if is_duplicate_key(&e) => {
                // Lost an upsert race; the winner's document is there now.
                debug!(collection, "Duplicate key on upsert, retrying as lookup");
                self.find_one(collection, filter)
                    .await?
                    .map(|document| (document, false))
                    .ok_or_else(|| SpkError::database(format!("Upsert into {} conflicted but no document found", collection)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_one(&self, collection: &str, document: Document) -> SpkResult<()> {
        match self.collection(collection).insert_one(document, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(SpkError::conflict(format!("Duplicate key in {}", collection))),
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_unique_index(&self, collection: &str, keys: &[&str]) -> SpkResult<()> {
        let mut index_keys = Document::new();
        for key in keys {
            index_keys.insert(*key, 1);
        }
        let model = IndexModel::builder()
            .keys(index_keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection(collection).create_index(model, None).await?;
        info!(collection, ?keys, "Unique index ensured");
        Ok(())
    }

    async fn ensure_geo_index(&self, collection: &str, field: &str) -> SpkResult<()> {
        let mut index_keys = Document::new();
        index_keys.insert(field, Bson::String("2dsphere".to_string()));
        let model = IndexModel::builder().keys(index_keys).build();
        self.collection(collection).create_index(model, None).await?;
        info!(collection, field, "2dsphere index ensured");
        Ok(())
    }

    async fn count(&self, collection: &str, filter: Document) -> SpkResult<u64> {
        Ok(self.collection(collection).count_documents(filter, None).await?)
    }
}
