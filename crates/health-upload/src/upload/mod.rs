//! Bulk upload of health-store deliveries
//!
//! Provides:
//! - One task per added sample and per deletion marker, joined before return
//! - Per-category permission gate, evaluated against a per-batch snapshot
//! - Calendar time index merged into every uploaded document
//! - Bounded concurrent store writes
//! - Minimum batch duration to pace a quota-limited store
//!
//! Upload is at-most-once: a sample that fails is logged and dropped. The
//! health store remains the source of truth and redelivers history on the
//! next full read.

pub mod progress;
pub mod rate_floor;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::{HealthError, Result};
use crate::models::{DeletedSample, Sample};
use crate::paths::{self, PathResolver};
use crate::privacy::AuthorizationFilter;
use crate::store::{Document, DocumentStore};
use crate::time_index::TimeIndex;

pub use progress::{SharedProgress, UploadProgress};
pub use rate_floor::{BatchFloor, WriteLimiter, DEFAULT_MAX_CONCURRENT, DEFAULT_MINIMUM_DURATION};

/// Tuning for batch uploads
#[derive(Debug, Clone, Copy)]
pub struct UploadOptions {
    /// Minimum wall-clock duration of one `process_bulk` call
    pub minimum_duration: Duration,
    /// Concurrent store writes per uploader
    pub max_concurrent: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            minimum_duration: DEFAULT_MINIMUM_DURATION,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// What happened to one added sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Written to the given document path
    Uploaded(String),
    /// Category not authorized for upload
    Skipped,
}

/// Mirrors health-store batches into a document store
pub struct BulkUploader {
    store: Arc<dyn DocumentStore>,
    paths: Arc<dyn PathResolver>,
    privacy: Arc<dyn AuthorizationFilter>,
    limiter: WriteLimiter,
    minimum_duration: Duration,
    progress: SharedProgress,
}

impl BulkUploader {
    /// Create an uploader with default pacing
    pub fn new(
        store: Arc<dyn DocumentStore>,
        paths: Arc<dyn PathResolver>,
        privacy: Arc<dyn AuthorizationFilter>,
    ) -> Self {
        Self::with_options(store, paths, privacy, UploadOptions::default())
    }

    pub fn with_options(
        store: Arc<dyn DocumentStore>,
        paths: Arc<dyn PathResolver>,
        privacy: Arc<dyn AuthorizationFilter>,
        opts: UploadOptions,
    ) -> Self {
        Self {
            store,
            paths,
            privacy,
            limiter: WriteLimiter::new(opts.max_concurrent),
            minimum_duration: opts.minimum_duration,
            progress: Arc::new(UploadProgress::new()),
        }
    }

    /// Counters shared with the uploader's tasks
    pub fn progress(&self) -> SharedProgress {
        Arc::clone(&self.progress)
    }

    /// Upload one delivery.
    ///
    /// Returns once every sample task has finished and the minimum batch
    /// duration has passed. Per-sample failures are logged, never returned.
    pub async fn process_bulk(&self, added: Vec<Sample>, deleted: Vec<DeletedSample>) {
        debug!(added = added.len(), deleted = deleted.len(), "Processing bulk delivery");
        let floor = BatchFloor::start(self.minimum_duration);

        self.progress.add_total(added.len() as u32);
        self.progress.add_deletions(deleted.len() as u32);

        let writer = SampleWriter {
            store: Arc::clone(&self.store),
            paths: Arc::clone(&self.paths),
            authorization: self.privacy.snapshot(),
            limiter: self.limiter.clone(),
            progress: Arc::clone(&self.progress),
        };

        let mut handles = Vec::with_capacity(added.len() + deleted.len());
        for sample in added {
            let writer = writer.clone();
            handles.push(tokio::spawn(async move {
                writer.add(sample).await;
            }));
        }
        for marker in deleted {
            handles.push(tokio::spawn(async move {
                remove(&marker);
            }));
        }

        for h in handles {
            if let Err(e) = h.await {
                error!(error = %e, "Upload task aborted");
            }
        }

        let slept = floor.wait().await;
        debug!(slept_ms = slept.as_millis() as u64, "Done processing bulk delivery");
    }

    /// Upload a single sample outside of a batch, surfacing the outcome
    pub async fn add(&self, sample: Sample) -> Result<SampleOutcome> {
        let writer = SampleWriter {
            store: Arc::clone(&self.store),
            paths: Arc::clone(&self.paths),
            authorization: self.privacy.snapshot(),
            limiter: self.limiter.clone(),
            progress: Arc::clone(&self.progress),
        };
        writer.upload(&sample).await
    }
}

/// Per-batch state shared by the sample tasks
#[derive(Clone)]
struct SampleWriter {
    store: Arc<dyn DocumentStore>,
    paths: Arc<dyn PathResolver>,
    authorization: Arc<dyn AuthorizationFilter>,
    limiter: WriteLimiter,
    progress: SharedProgress,
}

impl SampleWriter {
    /// Upload and record the outcome. Errors end here.
    async fn add(&self, sample: Sample) {
        match self.upload(&sample).await {
            Ok(SampleOutcome::Uploaded(path)) => {
                debug!(path = %path, "Uploaded sample");
                self.progress.upload_one(&path);
            }
            Ok(SampleOutcome::Skipped) => self.progress.skip_one(),
            Err(e @ HealthError::UnknownCategory(_)) => {
                debug!(error = %e, "Dropping sample of unknown type");
                self.progress.fail_one();
            }
            Err(e) => {
                warn!(
                    category = sample.kind.raw(),
                    error = %e,
                    "Failed to upload sample"
                );
                self.progress.fail_one();
            }
        }
    }

    async fn upload(&self, sample: &Sample) -> Result<SampleOutcome> {
        let category = sample
            .kind
            .identifier()
            .ok_or_else(|| HealthError::UnknownCategory(sample.kind.raw().to_string()))?;

        // Only upload types the participant gave permission for
        if !self.authorization.is_authorized(category) {
            return Ok(SampleOutcome::Skipped);
        }

        let effective_timestamp = sample.effective_timestamp();
        let path = paths::raw_document(self.paths.as_ref(), category, &effective_timestamp).await?;
        let doc = build_document(sample, &effective_timestamp)?;

        let _slot = self
            .limiter
            .acquire()
            .await
            .ok_or_else(|| HealthError::store_write("write limiter closed"))?;
        self.store.set(&path, doc, false).await?;

        Ok(SampleOutcome::Uploaded(path))
    }
}

/// Deletions are not mirrored yet: no tombstone is written and the
/// uploaded document stays in place.
fn remove(marker: &DeletedSample) {
    debug!(uuid = %marker.uuid, "Deleted sample not reconciled");
}

/// Stored form of a sample: payload fields, `device`, the time index and
/// `datetimeStart`. Later entries win on key collisions.
pub fn build_document(sample: &Sample, effective_timestamp: &str) -> Result<Document> {
    let mut doc = match &sample.payload {
        serde_json::Value::Object(map) => map.clone(),
        serde_json::Value::Null => Document::new(),
        other => {
            return Err(HealthError::Serialization(format!(
                "payload must be a JSON object, got {}",
                json_type(other)
            )))
        }
    };

    doc.insert("device".to_string(), sample.device.clone().into());
    doc.extend(TimeIndex::new(&sample.start, &sample.end).to_document());
    doc.insert("datetimeStart".to_string(), effective_timestamp.into());

    Ok(doc)
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
