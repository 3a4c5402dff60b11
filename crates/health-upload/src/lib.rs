pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod notifications;
pub mod paths;
pub mod privacy;
pub mod store;
pub mod time_index;
pub mod upload;
pub mod visibility;

pub use error::{HealthError, Result};
pub use store::{Document, DocumentSnapshot, DocumentStore};
pub use upload::BulkUploader;
