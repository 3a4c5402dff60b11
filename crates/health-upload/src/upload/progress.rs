//! Upload progress tracking with atomic counters

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Progress of the uploads issued by one uploader
///
/// Counters accumulate across batches. Every added sample ends in exactly
/// one of `uploaded`, `skipped` or `failed`.
#[derive(Debug)]
pub struct UploadProgress {
    /// Added samples received
    pub total: AtomicU32,
    /// Samples written to the store
    pub uploaded: AtomicU32,
    /// Samples withheld by the participant's permissions
    pub skipped: AtomicU32,
    /// Samples dropped after an error
    pub failed: AtomicU32,
    /// Deletion markers received
    pub deletions: AtomicU32,
    /// Start time for rate display
    pub start_time: Instant,
    /// Last uploaded document path
    last_item: Mutex<String>,
}

impl UploadProgress {
    pub fn new() -> Self {
        Self {
            total: AtomicU32::new(0),
            uploaded: AtomicU32::new(0),
            skipped: AtomicU32::new(0),
            failed: AtomicU32::new(0),
            deletions: AtomicU32::new(0),
            start_time: Instant::now(),
            last_item: Mutex::new(String::new()),
        }
    }

    /// Add to total when a batch arrives
    pub fn add_total(&self, count: u32) {
        self.total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_deletions(&self, count: u32) {
        self.deletions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn upload_one(&self, path: &str) {
        self.uploaded.fetch_add(1, Ordering::Relaxed);
        let mut last = self.last_item.lock().unwrap();
        *last = path.to_string();
    }

    pub fn skip_one(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fail_one(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_total(&self) -> u32 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn get_uploaded(&self) -> u32 {
        self.uploaded.load(Ordering::Relaxed)
    }

    pub fn get_skipped(&self) -> u32 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn get_failed(&self) -> u32 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn get_deletions(&self) -> u32 {
        self.deletions.load(Ordering::Relaxed)
    }

    /// Get the last uploaded document path
    pub fn get_last_item(&self) -> String {
        self.last_item.lock().unwrap().clone()
    }

    /// Samples that reached a final state
    pub fn processed(&self) -> u32 {
        self.get_uploaded() + self.get_skipped() + self.get_failed()
    }

    /// Fraction of received samples processed, 0.0 when nothing arrived
    pub fn fraction_completed(&self) -> f64 {
        let total = self.get_total();
        if total == 0 {
            return 0.0;
        }
        (self.processed() as f64 / total as f64).min(1.0)
    }

    pub fn is_complete(&self) -> bool {
        let total = self.get_total();
        total > 0 && self.processed() >= total
    }

    /// Get elapsed time as formatted string
    pub fn elapsed_str(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        let mins = secs / 60;

        if mins > 0 {
            format!("{}m {}s", mins, secs % 60)
        } else {
            format!("{}s", secs)
        }
    }
}

impl Default for UploadProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} uploaded, {} skipped, {} failed of {} ({} deletions ignored) in {}",
            self.get_uploaded(),
            self.get_skipped(),
            self.get_failed(),
            self.get_total(),
            self.get_deletions(),
            self.elapsed_str(),
        )
    }
}

/// Shared progress wrapped in Arc for parallel access
pub type SharedProgress = Arc<UploadProgress>;
