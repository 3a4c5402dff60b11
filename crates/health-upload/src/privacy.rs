//! Per-category upload permissions
//!
//! The participant decides which sample categories leave the device. The
//! uploader only reads these permissions, through a snapshot taken at the
//! start of each batch.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Answers whether a category may be uploaded
pub trait AuthorizationFilter: Send + Sync {
    /// Unknown categories are not authorized
    fn is_authorized(&self, category: &str) -> bool;

    /// Frozen view used for the duration of one batch
    fn snapshot(&self) -> Arc<dyn AuthorizationFilter>;
}

/// Immutable category -> permission map
#[derive(Debug, Clone, Default)]
pub struct CollectDataTypes(HashMap<String, bool>);

impl CollectDataTypes {
    pub fn new(map: HashMap<String, bool>) -> Self {
        Self(map)
    }
}

impl AuthorizationFilter for CollectDataTypes {
    fn is_authorized(&self, category: &str) -> bool {
        self.0.get(category).copied().unwrap_or(false)
    }

    fn snapshot(&self) -> Arc<dyn AuthorizationFilter> {
        Arc::new(self.clone())
    }
}

/// Live permission settings, changeable between batches
#[derive(Debug, Default)]
pub struct PrivacyModule {
    collect_data_types: RwLock<HashMap<String, bool>>,
}

impl PrivacyModule {
    pub fn new(collect_data_types: HashMap<String, bool>) -> Self {
        Self {
            collect_data_types: RwLock::new(collect_data_types),
        }
    }

    /// Grant or revoke upload permission for a category
    pub fn set_enabled(&self, category: impl Into<String>, enabled: bool) {
        self.collect_data_types
            .write()
            .unwrap()
            .insert(category.into(), enabled);
    }

    /// Categories with upload enabled, sorted
    pub fn enabled_categories(&self) -> Vec<String> {
        let mut enabled: Vec<String> = self
            .collect_data_types
            .read()
            .unwrap()
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(id, _)| id.clone())
            .collect();
        enabled.sort();
        enabled
    }
}

impl AuthorizationFilter for PrivacyModule {
    fn is_authorized(&self, category: &str) -> bool {
        self.collect_data_types
            .read()
            .unwrap()
            .get(category)
            .copied()
            .unwrap_or(false)
    }

    fn snapshot(&self) -> Arc<dyn AuthorizationFilter> {
        Arc::new(CollectDataTypes(self.collect_data_types.read().unwrap().clone()))
    }
}
