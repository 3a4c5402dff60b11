//! REST document service client
//!
//! Speaks a plain JSON document API authenticated with a bearer token:
//!
//! ```text
//! GET    /v1/documents/{path}            read, 404 when absent
//! PUT    /v1/documents/{path}            overwrite
//! PATCH  /v1/documents/{path}            merge
//! GET    /v1/collections/{path}?...      range or recent query
//! ```

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::{Document, DocumentSnapshot, DocumentStore};
use crate::error::{HealthError, Result};

/// User agent for document service requests
const API_USER_AGENT: &str = concat!("health-upload/", env!("CARGO_PKG_VERSION"));

/// Characters encoded inside one path segment
const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Remote document store client
#[derive(Clone)]
pub struct RemoteStore {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl RemoteStore {
    /// Create a client for the given base URL
    pub fn new(base_url: &str, access_token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(HealthError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    /// Build the full URL for a given API path
    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn document_url(&self, path: &str) -> String {
        self.build_url(&format!("/v1/documents/{}", encode_path(path)))
    }

    fn collection_url(&self, path: &str) -> String {
        self.build_url(&format!("/v1/collections/{}", encode_path(path)))
    }

    /// Build headers with authorization
    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(API_USER_AGENT));
        if let Some(token) = &self.access_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| HealthError::config("Access token contains invalid characters"))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn send(&self, method: Method, url: &str, body: Option<&Document>) -> Result<Response> {
        let mut request = self
            .client
            .request(method, url)
            .headers(self.build_headers()?);
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(HealthError::Http)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .headers(self.build_headers()?)
            .query(query)
            .send()
            .await
            .map_err(HealthError::Http)?;

        let response = check_status(response, HealthError::StoreRead).await?;
        response.json().await.map_err(|e| {
            HealthError::store_read(format!("Failed to parse JSON response: {}", e))
        })
    }
}

/// Percent-encode each segment of a slash-separated store path
fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT_ENCODE_SET).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Convert response status codes to errors. `kind` wraps failures that are
/// neither auth nor rate limiting.
async fn check_status(response: Response, kind: fn(String) -> HealthError) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(HealthError::NotAuthenticated),
        StatusCode::TOO_MANY_REQUESTS => Err(HealthError::RateLimited),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(kind(format!("HTTP {}: {}", status, body)))
        }
    }
}

#[async_trait]
impl DocumentStore for RemoteStore {
    async fn get(&self, path: &str) -> Result<Option<Document>> {
        let response = self.send(Method::GET, &self.document_url(path), None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check_status(response, HealthError::StoreRead).await?;
        let doc: Document = response.json().await.map_err(|e| {
            HealthError::store_read(format!("Failed to parse document: {}", e))
        })?;
        Ok(Some(doc))
    }

    async fn set(&self, path: &str, data: Document, merge: bool) -> Result<()> {
        let method = if merge { Method::PATCH } else { Method::PUT };
        let response = self.send(method, &self.document_url(path), Some(&data)).await?;
        check_status(response, HealthError::StoreWrite).await?;
        Ok(())
    }

    async fn query_range(
        &self,
        collection: &str,
        field: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<DocumentSnapshot>> {
        let query = [
            ("field", field.to_string()),
            ("from", from.to_string()),
            ("to", to.to_string()),
        ];
        self.get_json(&self.collection_url(collection), &query).await
    }

    async fn query_recent(
        &self,
        collection: &str,
        order_by: &str,
        limit: usize,
    ) -> Result<Vec<DocumentSnapshot>> {
        let query = [
            ("orderBy", order_by.to_string()),
            ("descending", "true".to_string()),
            ("limit", limit.to_string()),
        ];
        self.get_json(&self.collection_url(collection), &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let store = RemoteStore::new("https://docs.example.org/", None).unwrap();
        assert_eq!(
            store.document_url("u1/health/x/raw/leaf"),
            "https://docs.example.org/v1/documents/u1/health/x/raw/leaf"
        );
        assert_eq!(
            store.collection_url("u1/health/x/raw/"),
            "https://docs.example.org/v1/collections/u1/health/x/raw"
        );
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let store = RemoteStore::new("https://docs.example.org", None).unwrap();
        assert_eq!(
            store.document_url("u1/notifications/a#b?c d"),
            "https://docs.example.org/v1/documents/u1/notifications/a%23b%3Fc%20d"
        );
        assert_eq!(
            store.document_url("u1/health/x/raw/2024-03-01T08:00:00.000"),
            "https://docs.example.org/v1/documents/u1/health/x/raw/2024-03-01T08:00:00.000"
        );
        assert_eq!(encode_path("100%/raw"), "100%25/raw");
    }

    #[test]
    fn test_headers_include_bearer_token() {
        let store = RemoteStore::new("http://localhost", Some("abc".to_string())).unwrap();
        let headers = store.build_headers().unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");

        let anonymous = RemoteStore::new("http://localhost", None).unwrap();
        assert!(!anonymous.build_headers().unwrap().contains_key(AUTHORIZATION));
    }
}
