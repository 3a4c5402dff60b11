//! In-process document store

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{apply_write, field_in_range, newest_first, Document, DocumentSnapshot, DocumentStore};
use crate::error::Result;

/// Document store backed by a shared in-memory map
///
/// Cloning shares the underlying documents, so a test can keep a handle
/// while the uploader owns another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<Mutex<BTreeMap<String, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of one document, for inspection
    pub fn document(&self, path: &str) -> Option<Document> {
        self.docs.lock().unwrap().get(path).cloned()
    }

    /// All stored paths in order
    pub fn paths(&self) -> Vec<String> {
        self.docs.lock().unwrap().keys().cloned().collect()
    }

    fn collection(&self, collection: &str) -> Vec<DocumentSnapshot> {
        let prefix = format!("{}/", collection.trim_end_matches('/'));
        let docs = self.docs.lock().unwrap();
        docs.range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| !path[prefix.len()..].contains('/'))
            .map(|(path, data)| DocumentSnapshot {
                id: path[prefix.len()..].to_string(),
                data: data.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Document>> {
        Ok(self.document(path))
    }

    async fn set(&self, path: &str, data: Document, merge: bool) -> Result<()> {
        let mut docs = self.docs.lock().unwrap();
        let existing = docs.remove(path);
        docs.insert(path.to_string(), apply_write(existing, data, merge));
        Ok(())
    }

    async fn query_range(
        &self,
        collection: &str,
        field: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<DocumentSnapshot>> {
        Ok(self
            .collection(collection)
            .into_iter()
            .filter(|snap| field_in_range(&snap.data, field, from, to))
            .collect())
    }

    async fn query_recent(
        &self,
        collection: &str,
        order_by: &str,
        limit: usize,
    ) -> Result<Vec<DocumentSnapshot>> {
        Ok(newest_first(self.collection(collection), order_by, limit))
    }
}
