//! Hiding uploaded samples from downstream display
//!
//! Hidden documents stay in the store with `hideFlag: true`. Toggle and
//! range failures are returned to the caller.

use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::Result;
use crate::models::local_timestamp;
use crate::paths::{self, PathResolver};
use crate::store::{Document, DocumentSnapshot, DocumentStore};

/// Field holding the visibility flag
pub const HIDE_FLAG: &str = "hideFlag";

/// Field the range and recent queries are keyed on
pub const ISSUED_FIELD: &str = "issued";

/// Default page size of [`fetch_recent_samples`]
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// Flag value to write given the current one.
///
/// Absent flags are created hidden; `always_hide` forces hidden; otherwise
/// the flag flips.
pub fn next_hide_flag(current: Option<bool>, always_hide: bool) -> bool {
    match current {
        Some(_) if always_hide => true,
        Some(hidden) => !hidden,
        None => true,
    }
}

/// Toggle or force the hide flag of one sample document.
///
/// Returns the flag value written.
pub async fn toggle_hide_flag(
    store: &dyn DocumentStore,
    paths: &dyn PathResolver,
    category: &str,
    document_id: &str,
    always_hide: bool,
) -> Result<bool> {
    let path = paths::raw_document(paths, category, document_id)
        .await
        .map_err(|e| {
            error!(category, error = %e, "Failed to resolve sample path");
            e
        })?;
    debug!(category, path = %path, "Toggling hide flag");

    let current = store
        .get(&path)
        .await
        .map_err(|e| {
            error!(path = %path, error = %e, "Failed to read sample");
            e
        })?
        .and_then(|doc| doc.get(HIDE_FLAG).and_then(Value::as_bool));

    let hidden = next_hide_flag(current, always_hide);

    let mut update = Document::new();
    update.insert(HIDE_FLAG.to_string(), Value::Bool(hidden));
    store.set(&path, update, true).await.map_err(|e| {
        error!(path = %path, error = %e, "Failed to write hide flag");
        e
    })?;

    debug!(path = %path, hidden, "Hide flag written");
    Ok(hidden)
}

/// Hide every sample of a category issued within `[from, to]`.
///
/// Documents are processed one at a time; the first failure stops the run
/// and is returned. Returns the number of documents hidden.
pub async fn hide_samples(
    store: &dyn DocumentStore,
    paths: &dyn PathResolver,
    category: &str,
    from: &DateTime<FixedOffset>,
    to: &DateTime<FixedOffset>,
) -> Result<u32> {
    let collection = paths::raw_collection(paths, category).await?;
    let documents = store
        .query_range(
            &collection,
            ISSUED_FIELD,
            &local_timestamp(from),
            &local_timestamp(to),
        )
        .await?;
    debug!(category, matches = documents.len(), "Hiding samples in range");

    // TODO: move to a server-side batch update; one round trip per document is slow
    let mut hidden = 0;
    for document in &documents {
        toggle_hide_flag(store, paths, category, &document.id, true).await?;
        hidden += 1;
    }

    Ok(hidden)
}

/// Newest samples of a category by `issued`, empty on failure
pub async fn fetch_recent_samples(
    store: &dyn DocumentStore,
    paths: &dyn PathResolver,
    category: &str,
    limit: usize,
) -> Vec<DocumentSnapshot> {
    let collection = match paths::raw_collection(paths, category).await {
        Ok(c) => c,
        Err(e) => {
            error!(category, error = %e, "Failed to resolve sample collection");
            return Vec::new();
        }
    };

    match store.query_recent(&collection, ISSUED_FIELD, limit).await {
        Ok(docs) => docs,
        Err(e) => {
            error!(category, error = %e, "Failed to fetch recent samples");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::UserNamespace;
    use crate::store::MemoryStore;
    use serde_json::json;

    const CATEGORY: &str = "HKQuantityTypeIdentifierStepCount";

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_next_hide_flag() {
        assert!(next_hide_flag(None, false));
        assert!(next_hide_flag(None, true));
        assert!(!next_hide_flag(Some(true), false));
        assert!(next_hide_flag(Some(false), false));
        assert!(next_hide_flag(Some(true), true));
        assert!(next_hide_flag(Some(false), true));
    }

    #[tokio::test]
    async fn test_toggle_sequence() {
        let store = MemoryStore::new();
        let ns = UserNamespace::new(Some("u1".to_string()));
        let path = format!("u1/health/{}/raw/leaf", CATEGORY);
        store.set(&path, doc(json!({"value": 3})), false).await.unwrap();

        assert!(toggle_hide_flag(&store, &ns, CATEGORY, "leaf", false).await.unwrap());
        assert_eq!(store.document(&path).unwrap()[HIDE_FLAG], true);

        assert!(!toggle_hide_flag(&store, &ns, CATEGORY, "leaf", false).await.unwrap());
        assert_eq!(store.document(&path).unwrap()[HIDE_FLAG], false);

        assert!(toggle_hide_flag(&store, &ns, CATEGORY, "leaf", true).await.unwrap());
        assert!(toggle_hide_flag(&store, &ns, CATEGORY, "leaf", true).await.unwrap());

        let stored = store.document(&path).unwrap();
        assert_eq!(stored[HIDE_FLAG], true);
        assert_eq!(stored["value"], 3);
    }

    #[tokio::test]
    async fn test_non_bool_flag_treated_as_absent() {
        let store = MemoryStore::new();
        let ns = UserNamespace::new(Some("u1".to_string()));
        let path = format!("u1/health/{}/raw/leaf", CATEGORY);
        store.set(&path, doc(json!({ "hideFlag": "yes" })), false).await.unwrap();

        assert!(toggle_hide_flag(&store, &ns, CATEGORY, "leaf", false).await.unwrap());
    }

    #[tokio::test]
    async fn test_toggle_without_user_fails() {
        let store = MemoryStore::new();
        let ns = UserNamespace::new(None);

        assert!(toggle_hide_flag(&store, &ns, CATEGORY, "leaf", false).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_rejects_nested_document_id() {
        let store = MemoryStore::new();
        let ns = UserNamespace::new(Some("u1".to_string()));

        let err = toggle_hide_flag(&store, &ns, CATEGORY, "x/y/z", false).await.unwrap_err();
        assert!(matches!(err, crate::error::HealthError::PathResolution(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_hide_samples_in_range() {
        let store = MemoryStore::new();
        let ns = UserNamespace::new(Some("u1".to_string()));
        for (id, issued) in [
            ("a", "2024-03-01T08:00:00.000"),
            ("b", "2024-03-02T08:00:00.000"),
            ("c", "2024-03-05T08:00:00.000"),
        ] {
            store
                .set(
                    &format!("u1/health/{}/raw/{}", CATEGORY, id),
                    doc(json!({ "issued": issued, "hideFlag": true })),
                    false,
                )
                .await
                .unwrap();
        }

        let from = DateTime::parse_from_rfc3339("2024-03-01T00:00:00+01:00").unwrap();
        let to = DateTime::parse_from_rfc3339("2024-03-03T00:00:00+01:00").unwrap();
        let hidden = hide_samples(&store, &ns, CATEGORY, &from, &to).await.unwrap();
        assert_eq!(hidden, 2);

        // Already hidden documents stay hidden
        for id in ["a", "b", "c"] {
            let stored = store.document(&format!("u1/health/{}/raw/{}", CATEGORY, id)).unwrap();
            assert_eq!(stored[HIDE_FLAG], true);
        }
    }

    #[tokio::test]
    async fn test_fetch_recent_samples() {
        let store = MemoryStore::new();
        let ns = UserNamespace::new(Some("u1".to_string()));
        for (id, issued) in [("a", "2024-03-01"), ("b", "2024-03-03"), ("c", "2024-03-02")] {
            store
                .set(
                    &format!("u1/health/{}/raw/{}", CATEGORY, id),
                    doc(json!({ "issued": issued })),
                    false,
                )
                .await
                .unwrap();
        }

        let recent = fetch_recent_samples(&store, &ns, CATEGORY, 2).await;
        let ids: Vec<_> = recent.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);

        let unprovisioned = UserNamespace::new(None);
        assert!(fetch_recent_samples(&store, &unprovisioned, CATEGORY, 2).await.is_empty());
    }
}
