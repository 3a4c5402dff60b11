//! Batch upload command for health-upload

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cli::Context;
use crate::error::{HealthError, Result};
use crate::models::SampleBatch;
use crate::upload::BulkUploader;

/// Read a delivery from disk
pub fn read_batch(file: &Path) -> Result<SampleBatch> {
    let json = std::fs::read_to_string(file).map_err(|e| {
        HealthError::invalid_param(format!("Cannot read {}: {}", file.display(), e))
    })?;
    Ok(serde_json::from_str(&json)?)
}

/// Upload a JSON batch of added and deleted samples
pub async fn run(ctx: &Context, file: &Path) -> Result<()> {
    let batch = read_batch(file)?;
    info!(
        added = batch.added.len(),
        deleted = batch.deleted.len(),
        file = %file.display(),
        "Uploading batch"
    );

    let privacy = Arc::new(ctx.settings.privacy());
    let enabled = privacy.enabled_categories();
    if enabled.is_empty() {
        warn!("No sample types enabled, set collect_data_types in settings");
    } else {
        info!(categories = ?enabled, "Collecting enabled sample types");
    }

    let uploader = BulkUploader::with_options(
        Arc::clone(&ctx.store),
        ctx.paths.clone(),
        privacy,
        ctx.settings.upload_options(),
    );
    uploader.process_bulk(batch.added, batch.deleted).await;

    let progress = uploader.progress();
    println!("{}", progress);
    if ctx.settings.disable_upload {
        println!("Dry run: nothing was persisted.");
    } else if progress.get_uploaded() > 0 {
        println!("Last document: {}", progress.get_last_item());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_batch() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("batch.json");
        std::fs::write(
            &path,
            r#"{
                "added": [{
                    "type": "HKQuantityTypeIdentifierStepCount",
                    "start": "2024-03-01T08:00:00+01:00",
                    "end": "2024-03-01T08:10:00+01:00",
                    "device": "iPhone",
                    "payload": {"value": 120}
                }],
                "deleted": [{"uuid": "abc"}]
            }"#,
        )
        .unwrap();

        let batch = read_batch(&path).unwrap();
        assert_eq!(batch.added.len(), 1);
        assert_eq!(batch.deleted.len(), 1);
    }

    #[test]
    fn test_read_missing_batch() {
        let err = read_batch(Path::new("/nonexistent/batch.json")).unwrap_err();
        assert!(matches!(err, HealthError::InvalidParameter(_)));
    }
}
