pub mod commands;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info};

use crate::config::{self, Settings};
use crate::error::{HealthError, Result};
use crate::paths::UserNamespace;
use crate::store::{DocumentStore, JsonFileStore, MemoryStore, RemoteStore};

/// Everything a command needs, built once from settings
pub struct Context {
    pub settings: Settings,
    pub store: Arc<dyn DocumentStore>,
    pub paths: Arc<UserNamespace>,
}

impl Context {
    /// Pick the document store the settings ask for
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = if settings.disable_upload {
            info!("Uploads disabled, writing to an in-memory store");
            Arc::new(MemoryStore::new())
        } else if let Some(url) = settings.store_url() {
            debug!(url, "Using remote document store");
            Arc::new(RemoteStore::new(url, settings.access_token.clone())?)
        } else {
            let dir = settings.resolved_data_dir()?;
            config::ensure_dir(&dir)?;
            debug!(dir = %dir.display(), "Using local document store");
            Arc::new(JsonFileStore::new(dir))
        };

        let paths = Arc::new(UserNamespace::new(settings.user_id.clone()));

        Ok(Self {
            settings,
            store,
            paths,
        })
    }
}

/// Parse an RFC 3339 timestamp, keeping its offset
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .map_err(|_| HealthError::InvalidDateFormat(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2024-03-01T08:00:00+01:00").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 3600);

        let err = parse_timestamp("2024-03-01 08:00").unwrap_err();
        assert!(matches!(err, HealthError::InvalidDateFormat(_)));
    }

    #[test]
    fn test_local_store_creates_data_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");
        let settings = Settings {
            data_dir: Some(dir.clone()),
            ..Settings::default()
        };

        Context::from_settings(settings).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_disabled_upload_skips_data_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");
        let settings = Settings {
            data_dir: Some(dir.clone()),
            disable_upload: true,
            ..Settings::default()
        };

        Context::from_settings(settings).unwrap();
        assert!(!dir.exists());
    }
}
