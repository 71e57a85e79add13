//! In-memory document store for tests and dry runs. Enforces unique
//! indexes the same way MongoDB does.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use tokio::sync::RwLock;
use tracing::debug;

use spk_utils::{SpkError, SpkResult};

use crate::store::DocumentStore;

#[derive(Default)]
struct Collections {
    documents: HashMap<String, Vec<Document>>,
    unique_indexes: HashMap<String, Vec<Vec<String>>>,
}

impl Collections {
    fn find(&self, collection: &str, filter: &Document) -> Option<&Document> {
        self.documents
            .get(collection)?
            .iter()
            .find(|document| matches(document, filter))
    }

    fn violates_unique(&self, collection: &str, candidate: &Document) -> Option<String> {
        let indexes = self.unique_indexes.get(collection)?;
        let existing = self.documents.get(collection)?;

        indexes
            .iter()
            .find(|keys| {
                let key_of = |document: &Document| -> Vec<Bson> {
                    keys.iter()
                        .map(|k| document.get(k).cloned().unwrap_or(Bson::Null))
                        .collect()
                };
                let wanted = key_of(candidate);
                existing.iter().any(|document| key_of(document) == wanted)
            })
            .map(|keys| keys.join(", "))
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, value)| document.get(key) == Some(value))
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every document of a collection, in insertion order.
    pub async fn all(&self, collection: &str) -> Vec<Document> {
        self.inner
            .read()
            .await
            .documents
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(&self, collection: &str, filter: Document) -> SpkResult<Option<Document>> {
        Ok(self.inner.read().await.find(collection, &filter).cloned())
    }

    async fn find_or_insert(
        &self,
        collection: &str,
        filter: Document,
        mut candidate: Document,
    ) -> SpkResult<(Document, bool)> {
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner.find(collection, &filter) {
            return Ok((existing.clone(), false));
        }

        // Upserts seed the new document with the filter's equality fields.
        for (key, value) in filter {
            candidate.insert(key, value);
        }
        if let Some(keys) = inner.violates_unique(collection, &candidate) {
            return Err(SpkError::conflict(format!("Duplicate key ({}) in {}", keys, collection)));
        }

        debug!(collection, "Inserted document");
        inner
            .documents
            .entry(collection.to_string())
            .or_default()
            .push(candidate.clone());
        Ok((candidate, true))
    }

    async fn insert_one(&self, collection: &str, document: Document) -> SpkResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(keys) = inner.violates_unique(collection, &document) {
            return Err(SpkError::conflict(format!("Duplicate key ({}) in {}", keys, collection)));
        }
        inner
            .documents
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(())
    }

    async fn ensure_unique_index(&self, collection: &str, keys: &[&str]) -> SpkResult<()> {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        let mut inner = self.inner.write().await;
        let indexes = inner.unique_indexes.entry(collection.to_string()).or_default();
        if !indexes.contains(&keys) {
            indexes.push(keys);
        }
        Ok(())
    }

    async fn count(&self, collection: &str, filter: Document) -> SpkResult<u64> {
        let inner = self.inner.read().await;
        let count = inner
            .documents
            .get(collection)
            .map(|documents| documents.iter().filter(|d| matches(d, &filter)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }
}
