//! Storage path resolution under the current user's namespace

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{HealthError, Result};

/// Subtree of the user namespace a path belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Module {
    /// Samples of one category: `<user>/health/<category>/`
    Health(String),
    /// Notification receipts: `<user>/notifications/`
    Notifications,
}

/// Resolves the collection prefix for a module
///
/// Prefixes end with `/` so leaf keys can be appended directly.
#[async_trait]
pub trait PathResolver: Send + Sync {
    async fn resolve(&self, module: &Module) -> Result<String>;
}

/// Resolver rooted at a user id that may not be known yet
#[derive(Debug, Default)]
pub struct UserNamespace {
    user_id: RwLock<Option<String>>,
}

impl UserNamespace {
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            user_id: RwLock::new(user_id),
        }
    }

    /// Set the user once the account is provisioned
    pub fn set_user(&self, user_id: impl Into<String>) {
        *self.user_id.write().unwrap() = Some(user_id.into());
    }

    pub fn user_id(&self) -> Option<String> {
        self.user_id.read().unwrap().clone()
    }
}

#[async_trait]
impl PathResolver for UserNamespace {
    async fn resolve(&self, module: &Module) -> Result<String> {
        let user = self
            .user_id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                HealthError::path("No user namespace. Set --user or HEALTH_UPLOAD_USER.")
            })?;

        match module {
            Module::Health(category) => {
                if category.is_empty() || category.contains('/') {
                    return Err(HealthError::path(format!("Invalid category: {:?}", category)));
                }
                Ok(format!("{}/health/{}/", user, category))
            }
            Module::Notifications => Ok(format!("{}/notifications/", user)),
        }
    }
}

/// Collection of raw sample documents for one category
pub async fn raw_collection(resolver: &dyn PathResolver, category: &str) -> Result<String> {
    let prefix = resolver.resolve(&Module::Health(category.to_string())).await?;
    Ok(format!("{}raw", prefix))
}

/// Full document path of one raw sample: `<user>/health/<category>/raw/<leaf>`
pub async fn raw_document(
    resolver: &dyn PathResolver,
    category: &str,
    leaf: &str,
) -> Result<String> {
    check_leaf(leaf)?;
    let prefix = resolver.resolve(&Module::Health(category.to_string())).await?;
    Ok(format!("{}raw/{}", prefix, leaf))
}

/// Document path of one notification receipt: `<user>/notifications/<leaf>`
pub async fn notification_document(resolver: &dyn PathResolver, leaf: &str) -> Result<String> {
    check_leaf(leaf)?;
    let prefix = resolver.resolve(&Module::Notifications).await?;
    Ok(format!("{}{}", prefix, leaf))
}

/// A leaf key must be exactly one path segment
fn check_leaf(leaf: &str) -> Result<()> {
    if leaf.is_empty() || leaf == "." || leaf == ".." || leaf.contains('/') {
        return Err(HealthError::path(format!("Invalid document key: {:?}", leaf)));
    }
    Ok(())
}
