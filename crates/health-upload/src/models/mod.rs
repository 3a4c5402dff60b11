//! Data models for health-store samples

pub mod sample;

pub use sample::{local_timestamp, DeletedSample, Sample, SampleBatch, SampleKind};
