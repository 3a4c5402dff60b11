//! JSON file document store for local storage
//!
//! Each document is one `<base>/<path>.json` file. Writes go through a temp
//! file and an atomic rename, so readers never observe a partial document.
//! Writes to the same document are serialized with a per-document lock.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex as TokioMutex;

use super::{apply_write, field_in_range, newest_first, Document, DocumentSnapshot, DocumentStore};
use crate::error::{HealthError, Result};

const EXTENSION: &str = "json";

/// Document store writing one JSON file per document
#[derive(Clone)]
pub struct JsonFileStore {
    base_path: PathBuf,
    /// Per-document locks for read-modify-write safety
    document_locks: Arc<DashMap<String, Arc<TokioMutex<()>>>>,
}

impl JsonFileStore {
    /// Create a store rooted at the given directory
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            document_locks: Arc::new(DashMap::new()),
        }
    }

    /// Get or create the lock for one document
    fn document_lock(&self, path: &str) -> Arc<TokioMutex<()>> {
        self.document_locks
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(TokioMutex::new(())))
            .clone()
    }

    /// Drop a document's lock once no writer holds or awaits it
    fn release_lock(&self, path: &str, lock: Arc<TokioMutex<()>>) {
        drop(lock);
        self.document_locks.remove_if(path, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// File backing a document path
    pub fn document_file(&self, path: &str) -> Result<PathBuf> {
        let mut file = self.base_path.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(HealthError::invalid_param(format!(
                    "Invalid document path: {}",
                    path
                )));
            }
            file.push(segment);
        }
        if file == self.base_path {
            return Err(HealthError::invalid_param("Empty document path"));
        }
        let name = format!(
            "{}.{}",
            file.file_name().and_then(|n| n.to_str()).unwrap_or_default(),
            EXTENSION
        );
        file.set_file_name(name);
        Ok(file)
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        let mut dir = self.base_path.clone();
        for segment in collection.split('/').filter(|s| !s.is_empty()) {
            dir.push(segment);
        }
        dir
    }

    fn read_file(file: &Path) -> Result<Option<Document>> {
        if !file.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(file)
            .map_err(|e| HealthError::store_read(format!("{}: {}", file.display(), e)))?;
        let doc: Document = serde_json::from_str(&json)
            .map_err(|e| HealthError::store_read(format!("{}: {}", file.display(), e)))?;
        Ok(Some(doc))
    }

    fn write_file(file: &Path, doc: &Document) -> Result<()> {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                HealthError::store_write(format!("Failed to create directory: {}", e))
            })?;
        }

        // Write to temp file first
        let temp_path = file.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| HealthError::Serialization(e.to_string()))?;
        fs::write(&temp_path, json)
            .map_err(|e| HealthError::store_write(format!("Failed to write temp file: {}", e)))?;

        // Atomic rename
        fs::rename(&temp_path, file)
            .map_err(|e| HealthError::store_write(format!("Failed to rename temp file: {}", e)))?;

        Ok(())
    }

    fn read_collection(&self, collection: &str) -> Result<Vec<DocumentSnapshot>> {
        let dir = self.collection_dir(collection);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir)
            .map_err(|e| HealthError::store_read(format!("{}: {}", dir.display(), e)))?;

        let mut docs = Vec::new();
        for entry in entries {
            let file = entry
                .map_err(|e| HealthError::store_read(e.to_string()))?
                .path();
            if file.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(id) = file.file_stem().and_then(|s| s.to_str()).map(String::from) else {
                continue;
            };
            if let Some(data) = Self::read_file(&file)? {
                docs.push(DocumentSnapshot { id, data });
            }
        }
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn get(&self, path: &str) -> Result<Option<Document>> {
        let file = self.document_file(path)?;
        Self::read_file(&file)
    }

    async fn set(&self, path: &str, data: Document, merge: bool) -> Result<()> {
        let file = self.document_file(path)?;
        let lock = self.document_lock(path);

        let result = {
            let _guard = lock.lock().await;
            let existing = if merge { Self::read_file(&file) } else { Ok(None) };
            existing.and_then(|existing| {
                Self::write_file(&file, &apply_write(existing, data, merge))
            })
        };

        self.release_lock(path, lock);
        result
    }

    async fn query_range(
        &self,
        collection: &str,
        field: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<DocumentSnapshot>> {
        Ok(self
            .read_collection(collection)?
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
        Ok(newest_first(self.read_collection(collection)?, order_by, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_document_file_layout() {
        let store = JsonFileStore::new("/data");
        let file = store
            .document_file("u1/health/HKQuantityTypeIdentifierStepCount/raw/2024-03-01T08:00:00.000")
            .unwrap();
        assert_eq!(
            file,
            PathBuf::from("/data/u1/health/HKQuantityTypeIdentifierStepCount/raw/2024-03-01T08:00:00.000.json")
        );
    }

    #[test]
    fn test_document_file_rejects_traversal() {
        let store = JsonFileStore::new("/data");
        assert!(store.document_file("u1/../../etc/passwd").is_err());
        assert!(store.document_file("").is_err());
    }

    #[tokio::test]
    async fn test_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.path());

        store.set("u1/health/x/raw/a", doc(json!({"v": 1})), false).await.unwrap();
        let loaded = store.get("u1/health/x/raw/a").await.unwrap().unwrap();
        assert_eq!(loaded["v"], 1);
        assert!(store.get("u1/health/x/raw/b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_preserves_fields() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.path());

        store.set("u1/c/d", doc(json!({"v": 1})), false).await.unwrap();
        store.set("u1/c/d", doc(json!({"hideFlag": true})), true).await.unwrap();

        let loaded = store.get("u1/c/d").await.unwrap().unwrap();
        assert_eq!(loaded["v"], 1);
        assert_eq!(loaded["hideFlag"], true);
        assert!(!temp.path().join("u1/c/d.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_query_range_and_recent() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.path());

        for (id, issued) in [("a", "2024-01-02"), ("b", "2024-01-05"), ("c", "2024-01-09")] {
            store
                .set(&format!("u1/raw/{}", id), doc(json!({ "issued": issued })), false)
                .await
                .unwrap();
        }

        let hits = store
            .query_range("u1/raw", "issued", "2024-01-03", "2024-01-09")
            .await
            .unwrap();
        let ids: Vec<_> = hits.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);

        let recent = store.query_recent("u1/raw", "issued", 1).await.unwrap();
        assert_eq!(recent[0].id, "c");

        assert!(store.query_recent("u1/missing", "issued", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_merges_to_one_document() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.path());
        store.set("u1/doc", doc(json!({})), false).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut fields = Document::new();
                fields.insert(format!("f{}", i), json!(i));
                store.set("u1/doc", fields, true).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let loaded = store.get("u1/doc").await.unwrap().unwrap();
        assert_eq!(loaded.len(), 8);
        assert!(store.document_locks.is_empty());
    }

    #[tokio::test]
    async fn test_locks_released_after_writes() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.path());

        for i in 0..20 {
            store
                .set(&format!("u1/health/x/raw/{}", i), doc(json!({"v": i})), false)
                .await
                .unwrap();
        }
        store.set("u1/health/x/raw/0", doc(json!({"hideFlag": true})), true).await.unwrap();

        assert!(store.document_locks.is_empty());
        assert_eq!(store.get("u1/health/x/raw/0").await.unwrap().unwrap()["v"], 0);
    }
}
