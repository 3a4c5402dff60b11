//! Sample data models delivered by the platform health store
//!
//! These structures represent the added and deleted samples of one
//! delivery batch.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

const QUANTITY_PREFIX: &str = "HKQuantityTypeIdentifier";
const CATEGORY_PREFIX: &str = "HKCategoryTypeIdentifier";
const WORKOUT_IDENTIFIER: &str = "HKWorkoutTypeIdentifier";

/// Format of the leaf key and `datetimeStart` field: local wall clock with
/// millisecond precision, no offset.
pub const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Kind of a sample, resolved once when the sample is ingested
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SampleKind {
    Quantity(String),
    Category(String),
    Workout,
    /// Unrecognized type, keeps the raw identifier
    Unknown(String),
}

impl SampleKind {
    /// Classify a raw type identifier
    pub fn from_identifier(identifier: &str) -> Self {
        if identifier == WORKOUT_IDENTIFIER {
            SampleKind::Workout
        } else if has_suffix_after(identifier, QUANTITY_PREFIX) {
            SampleKind::Quantity(identifier.to_string())
        } else if has_suffix_after(identifier, CATEGORY_PREFIX) {
            SampleKind::Category(identifier.to_string())
        } else {
            SampleKind::Unknown(identifier.to_string())
        }
    }

    /// Stable category identifier, `None` for unknown samples
    pub fn identifier(&self) -> Option<&str> {
        match self {
            SampleKind::Quantity(id) | SampleKind::Category(id) => Some(id),
            SampleKind::Workout => Some(WORKOUT_IDENTIFIER),
            SampleKind::Unknown(_) => None,
        }
    }

    /// Identifier as delivered, including unrecognized ones
    pub fn raw(&self) -> &str {
        match self {
            SampleKind::Quantity(id) | SampleKind::Category(id) | SampleKind::Unknown(id) => id,
            SampleKind::Workout => WORKOUT_IDENTIFIER,
        }
    }
}

fn has_suffix_after(identifier: &str, prefix: &str) -> bool {
    identifier.len() > prefix.len() && identifier.starts_with(prefix)
}

impl From<String> for SampleKind {
    fn from(identifier: String) -> Self {
        SampleKind::from_identifier(&identifier)
    }
}

impl From<SampleKind> for String {
    fn from(kind: SampleKind) -> Self {
        match kind {
            SampleKind::Quantity(id) | SampleKind::Category(id) | SampleKind::Unknown(id) => id,
            SampleKind::Workout => WORKOUT_IDENTIFIER.to_string(),
        }
    }
}

/// One observation from the health store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Sample type, serialized as its raw identifier
    #[serde(rename = "type")]
    pub kind: SampleKind,

    /// Interval start in the device's local offset
    pub start: DateTime<FixedOffset>,

    /// Interval end; equal to `start` for point samples
    pub end: DateTime<FixedOffset>,

    /// Name of the source device
    pub device: String,

    /// Measurement record, opaque to the uploader
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Sample {
    pub fn new(
        kind: SampleKind,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        device: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            start,
            end,
            device: device.into(),
            payload,
        }
    }

    /// Leaf key of the sample's document: local start time
    pub fn effective_timestamp(&self) -> String {
        local_timestamp(&self.start)
    }
}

/// A sample removed from the health store since the last delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedSample {
    pub uuid: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SampleKind>,
}

/// One delivery from the health store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleBatch {
    #[serde(default)]
    pub added: Vec<Sample>,
    #[serde(default)]
    pub deleted: Vec<DeletedSample>,
}

/// Local wall-clock timestamp used for leaf keys and range queries
pub fn local_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.naive_local().format(LOCAL_TIMESTAMP_FORMAT).to_string()
}
