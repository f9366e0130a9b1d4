//! Backend Client
//!
//! The store talks to the backend through [`BackendClient`] so that tests can
//! swap in a scripted client. [`ApiClient`] is the real HTTP implementation.

use super::http::{BasicAuth, HttpClient};
use crate::resource::RawResource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

/// Operations the store needs from the backend
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Fetch the raw resource collection at `path`
    async fn get_resources(&self, path: &str) -> Result<Vec<RawResource>>;

    /// Write `payload` to `path`, returning whatever the backend answered
    async fn put(&self, path: &str, payload: &Value) -> Result<Value>;
}

/// HTTP client for the bow REST API (`<endpoint>/v1/...`)
#[derive(Clone)]
pub struct ApiClient {
    pub http: HttpClient,
    api_root: Url,
}

impl ApiClient {
    pub fn new(endpoint: &str, auth: Option<BasicAuth>) -> Result<Self> {
        let mut base =
            Url::parse(endpoint).with_context(|| format!("Invalid endpoint URL: {}", endpoint))?;

        // without the trailing slash `join` would replace the last segment
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let api_root = base.join("v1/").context("Failed to build API root URL")?;
        let http = HttpClient::new(auth)?;

        Ok(Self { http, api_root })
    }

    /// Build the full URL for an API path such as `resources`
    pub fn url(&self, path: &str) -> Result<Url> {
        self.api_root
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("Invalid API path: {}", path))
    }
}

#[async_trait]
impl BackendClient for ApiClient {
    async fn get_resources(&self, path: &str) -> Result<Vec<RawResource>> {
        let url = self.url(path)?;
        let body = self.http.get(url.as_str()).await?;

        // an empty body decodes as null and fails here, never as an empty list
        serde_json::from_value(body).context("Failed to decode resource list")
    }

    async fn put(&self, path: &str, payload: &Value) -> Result<Value> {
        let url = self.url(path)?;
        self.http.put(url.as_str(), payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = ApiClient::new("http://localhost:9300", None).unwrap();
        assert_eq!(
            client.url("resources").unwrap().as_str(),
            "http://localhost:9300/v1/resources"
        );
        assert_eq!(
            client.url("/policies").unwrap().as_str(),
            "http://localhost:9300/v1/policies"
        );
    }

    #[test]
    fn test_url_building_keeps_base_path() {
        let client = ApiClient::new("https://ops.example.com/bow", None).unwrap();
        assert_eq!(
            client.url("resources").unwrap().as_str(),
            "https://ops.example.com/bow/v1/resources"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        assert!(ApiClient::new("not a url", None).is_err());
    }
}
