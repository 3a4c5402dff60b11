use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HealthError, Result};
use crate::privacy::PrivacyModule;
use crate::upload::{UploadOptions, DEFAULT_MAX_CONCURRENT, DEFAULT_MINIMUM_DURATION};

/// Local document store emulator
pub const DEFAULT_EMULATOR_URL: &str = "http://localhost:8080";

/// Process-wide settings, read once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Dry run: uploads go to an in-memory store
    pub disable_upload: bool,
    /// Talk to the local emulator instead of `remote_url`
    pub use_emulator: bool,
    pub emulator_url: String,
    pub remote_url: Option<String>,
    /// Directory of the local JSON document store
    pub data_dir: Option<PathBuf>,
    pub user_id: Option<String>,
    pub access_token: Option<String>,
    pub max_concurrent: usize,
    pub minimum_batch_ms: u64,
    /// Category identifier to upload permission
    pub collect_data_types: HashMap<String, bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            disable_upload: false,
            use_emulator: false,
            emulator_url: DEFAULT_EMULATOR_URL.to_string(),
            remote_url: None,
            data_dir: None,
            user_id: None,
            access_token: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            minimum_batch_ms: DEFAULT_MINIMUM_DURATION.as_millis() as u64,
            collect_data_types: HashMap::new(),
        }
    }
}

/// Values given on the command line, applied over the file
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub data_dir: Option<PathBuf>,
    pub remote_url: Option<String>,
    pub user_id: Option<String>,
    pub access_token: Option<String>,
    pub disable_upload: bool,
    pub use_emulator: bool,
}

impl Settings {
    /// Load settings from a JSON file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| {
            HealthError::config(format!("Invalid settings file {}: {}", path.display(), e))
        })
    }

    /// Apply command-line values. Flags only ever switch features on.
    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        if overrides.data_dir.is_some() {
            self.data_dir = overrides.data_dir;
        }
        if overrides.remote_url.is_some() {
            self.remote_url = overrides.remote_url;
        }
        if overrides.user_id.is_some() {
            self.user_id = overrides.user_id;
        }
        if overrides.access_token.is_some() {
            self.access_token = overrides.access_token;
        }
        self.disable_upload |= overrides.disable_upload;
        self.use_emulator |= overrides.use_emulator;
        self
    }

    /// Remote endpoint to use, if any
    pub fn store_url(&self) -> Option<&str> {
        if self.use_emulator {
            Some(&self.emulator_url)
        } else {
            self.remote_url.as_deref()
        }
    }

    /// Directory of the local store, falling back to the platform data dir
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => super::data_dir(),
        }
    }

    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            minimum_duration: Duration::from_millis(self.minimum_batch_ms),
            max_concurrent: self.max_concurrent,
        }
    }

    pub fn privacy(&self) -> PrivacyModule {
        PrivacyModule::new(self.collect_data_types.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privacy::AuthorizationFilter;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::load(&temp.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.upload_options().minimum_duration, Duration::from_millis(1200));
    }

    #[test]
    fn test_partial_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{
                "user_id": "u1",
                "minimum_batch_ms": 0,
                "collect_data_types": {"HKQuantityTypeIdentifierStepCount": true}
            }"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.user_id.as_deref(), Some("u1"));
        assert_eq!(settings.minimum_batch_ms, 0);
        assert_eq!(settings.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert!(settings.privacy().is_authorized("HKQuantityTypeIdentifierStepCount"));
        assert!(!settings.privacy().is_authorized("HKQuantityTypeIdentifierHeartRate"));
    }

    #[test]
    fn test_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, HealthError::Config(_)));
    }

    #[test]
    fn test_serialized_settings_load_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.json");
        let settings = Settings {
            remote_url: Some("https://store.example.com".to_string()),
            ..Settings::default()
        };

        std::fs::write(&path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings {
            user_id: Some("from-file".to_string()),
            remote_url: Some("https://file.example.com".to_string()),
            ..Settings::default()
        }
        .with_overrides(SettingsOverrides {
            user_id: Some("from-flag".to_string()),
            use_emulator: true,
            ..SettingsOverrides::default()
        });

        assert_eq!(settings.user_id.as_deref(), Some("from-flag"));
        assert_eq!(settings.remote_url.as_deref(), Some("https://file.example.com"));
        assert_eq!(settings.store_url(), Some(DEFAULT_EMULATOR_URL));
    }

    #[test]
    fn test_store_url_without_remote() {
        assert_eq!(Settings::default().store_url(), None);
    }
}
