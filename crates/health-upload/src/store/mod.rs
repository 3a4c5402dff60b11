//! Document store layer
//!
//! Uploaded samples live in a schema-less document store addressed by
//! slash-separated paths:
//!
//! ```text
//! <user>/health/<category>/raw/<leaf>     # one document per sample
//! <user>/notifications/<timestamp>        # notification receipts
//! ```
//!
//! A path with an even number of segments names a document, the path of its
//! parent names the collection. Three backends are provided:
//!
//! - [`MemoryStore`]: in-process, for tests and dry runs
//! - [`JsonFileStore`]: one JSON file per document on local disk
//! - [`RemoteStore`]: REST document service over HTTPS

mod json_fs;
mod memory;
mod remote;

pub use json_fs::JsonFileStore;
pub use memory::MemoryStore;
pub use remote::RemoteStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Field map of one stored document
pub type Document = Map<String, Value>;

/// A document returned by a collection query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Leaf key of the document within its collection
    pub id: String,
    pub data: Document,
}

/// Primitive operations the uploader needs from a document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document, `None` if it does not exist
    async fn get(&self, path: &str) -> Result<Option<Document>>;

    /// Write a document. With `merge` only the given fields are replaced,
    /// otherwise the document is overwritten.
    async fn set(&self, path: &str, data: Document, merge: bool) -> Result<()>;

    /// Documents of a collection whose string `field` lies in `[from, to]`,
    /// ordered by document id
    async fn query_range(
        &self,
        collection: &str,
        field: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<DocumentSnapshot>>;

    /// Newest `limit` documents of a collection by descending `order_by`
    async fn query_recent(
        &self,
        collection: &str,
        order_by: &str,
        limit: usize,
    ) -> Result<Vec<DocumentSnapshot>>;
}

/// Merge `data` into `existing` (new values win) or replace it
pub(crate) fn apply_write(existing: Option<Document>, data: Document, merge: bool) -> Document {
    match existing {
        Some(mut doc) if merge => {
            doc.extend(data);
            doc
        }
        _ => data,
    }
}

/// Whether a document's string `field` lies in `[from, to]`
pub(crate) fn field_in_range(doc: &Document, field: &str, from: &str, to: &str) -> bool {
    doc.get(field)
        .and_then(Value::as_str)
        .map(|v| v >= from && v <= to)
        .unwrap_or(false)
}

/// Sort snapshots by descending `order_by` and keep the first `limit`.
/// Documents without the field sort last.
pub(crate) fn newest_first(
    mut docs: Vec<DocumentSnapshot>,
    order_by: &str,
    limit: usize,
) -> Vec<DocumentSnapshot> {
    docs.sort_by(|a, b| {
        let ka = a.data.get(order_by).and_then(Value::as_str);
        let kb = b.data.get(order_by).and_then(Value::as_str);
        kb.cmp(&ka)
    });
    docs.truncate(limit);
    docs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_apply_write_merge_keeps_other_fields() {
        let existing = doc(json!({"a": 1, "hideFlag": false}));
        let merged = apply_write(Some(existing), doc(json!({"hideFlag": true})), true);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["hideFlag"], true);
    }

    #[test]
    fn test_apply_write_overwrite() {
        let existing = doc(json!({"a": 1}));
        let written = apply_write(Some(existing), doc(json!({"b": 2})), false);
        assert!(!written.contains_key("a"));
        assert_eq!(written["b"], 2);
    }

    #[test]
    fn test_newest_first() {
        let docs = vec![
            DocumentSnapshot { id: "1".into(), data: doc(json!({"issued": "2024-01-01"})) },
            DocumentSnapshot { id: "2".into(), data: doc(json!({})) },
            DocumentSnapshot { id: "3".into(), data: doc(json!({"issued": "2024-03-01"})) },
        ];
        let ids: Vec<_> = newest_first(docs, "issued", 2).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }
}
