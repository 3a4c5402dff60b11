use thiserror::Error;

/// Main error type for health-upload
#[derive(Error, Debug)]
pub enum HealthError {
    #[error("Failed to resolve storage path: {0}")]
    PathResolution(String),

    #[error("Failed to serialize sample: {0}")]
    Serialization(String),

    #[error("Document store write failed: {0}")]
    StoreWrite(String),

    #[error("Document store read failed: {0}")]
    StoreRead(String),

    #[error("Unknown sample category: {0}")]
    UnknownCategory(String),

    #[error("Document store rejected the access token. Check --token or HEALTH_UPLOAD_TOKEN.")]
    NotAuthenticated,

    #[error("Rate limited by the document store. Please wait before retrying.")]
    RateLimited,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid timestamp: {0}. Expected RFC 3339, e.g. 2024-03-01T08:00:00+01:00")]
    InvalidDateFormat(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, HealthError>;

impl HealthError {
    /// Create a path resolution error from a message
    pub fn path(msg: impl Into<String>) -> Self {
        Self::PathResolution(msg.into())
    }

    /// Create a store write error from a message
    pub fn store_write(msg: impl Into<String>) -> Self {
        Self::StoreWrite(msg.into())
    }

    /// Create a store read error from a message
    pub fn store_read(msg: impl Into<String>) -> Self {
        Self::StoreRead(msg.into())
    }

    /// Create a configuration error from a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid parameter error from a message
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

/// Render an error for the terminal, with a hint where one helps
pub fn format_user_error(err: &HealthError) -> String {
    match err {
        HealthError::PathResolution(_) => {
            format!("{}\nSet a participant with --user or HEALTH_UPLOAD_USER.", err)
        }
        HealthError::Http(e) if e.is_connect() => {
            format!("{}\nIs the document store reachable? Try --use-emulator for local runs.", err)
        }
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HealthError::PathResolution("user not provisioned".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to resolve storage path: user not provisioned"
        );
    }

    #[test]
    fn test_not_authenticated_error() {
        let err = HealthError::NotAuthenticated;
        assert!(err.to_string().contains("HEALTH_UPLOAD_TOKEN"));
    }

    #[test]
    fn test_invalid_date_format_error() {
        let err = HealthError::InvalidDateFormat("yesterday".to_string());
        assert!(err.to_string().contains("yesterday"));
        assert!(err.to_string().contains("RFC 3339"));
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(HealthError::path("x"), HealthError::PathResolution(_)));
        assert!(matches!(HealthError::store_write("x"), HealthError::StoreWrite(_)));
        assert!(matches!(HealthError::store_read("x"), HealthError::StoreRead(_)));
        assert!(matches!(HealthError::config("x"), HealthError::Config(_)));
        assert!(matches!(
            HealthError::invalid_param("x"),
            HealthError::InvalidParameter(_)
        ));
    }

    #[test]
    fn test_format_user_error_hint() {
        let msg = format_user_error(&HealthError::path("no user"));
        assert!(msg.contains("HEALTH_UPLOAD_USER"));
        assert_eq!(
            format_user_error(&HealthError::RateLimited),
            HealthError::RateLimited.to_string()
        );
    }
}
