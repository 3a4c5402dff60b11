//! Push notification receipts
//!
//! Records when a notification reached the device. Failures are logged,
//! never returned.

use serde_json::Value;
use tracing::{debug, warn};

use crate::paths::{self, PathResolver};
use crate::store::{Document, DocumentStore};

/// Store `{"received": timestamp}` at `<user>/notifications/<timestamp>`.
///
/// Returns whether the receipt was written.
pub async fn add_notification_received_timestamp(
    store: &dyn DocumentStore,
    resolver: &dyn PathResolver,
    timestamp: &str,
) -> bool {
    let path = match paths::notification_document(resolver, timestamp).await {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Failed to resolve notification path");
            return false;
        }
    };

    let mut receipt = Document::new();
    receipt.insert("received".to_string(), Value::String(timestamp.to_string()));

    match store.set(&path, receipt, false).await {
        Ok(()) => {
            debug!(path = %path, "Notification receipt stored");
            true
        }
        Err(e) => {
            warn!(path = %path, error = %e, "Failed to store notification receipt");
            false
        }
    }
}
