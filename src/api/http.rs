//! HTTP utilities for backend REST calls

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate a response body and strip control characters before logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Basic auth credentials for the backend
#[derive(Clone, Debug)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// Thin reqwest wrapper shared by every backend call
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    auth: Option<BasicAuth>,
}

impl HttpClient {
    pub fn new(auth: Option<BasicAuth>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("bowdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, auth })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(auth) => request.basic_auth(&auth.username, Some(&auth.password)),
            None => request,
        }
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);

        let request = self.authorize(self.client.get(url));
        Self::execute(request).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        tracing::debug!("PUT {}", url);

        let request = self.authorize(self.client.put(url)).json(body);
        Self::execute(request).await
    }

    async fn execute(request: RequestBuilder) -> Result<Value> {
        let response = request.send().await.context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(anyhow::anyhow!("API request failed: {}", status));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}

/// Format a backend error for display
pub fn format_api_error(error: &anyhow::Error) -> String {
    let error_str = error.to_string();

    if error_str.contains("401") {
        return "Authentication failed. Check BASIC_AUTH_USER and BASIC_AUTH_PASSWORD.".to_string();
    }
    if error_str.contains("403") {
        return "Permission denied.".to_string();
    }
    if error_str.contains("404") {
        return "Resource not found.".to_string();
    }
    if error_str.contains("400") {
        return "Invalid request. Check the policy fields.".to_string();
    }
    if error_str.contains("500") || error_str.contains("503") {
        return "Backend temporarily unavailable. Please try again.".to_string();
    }
    if error_str.contains("API request failed") {
        return "Request failed. Check your network connection and try again.".to_string();
    }

    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(80)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let logged = sanitize_for_log(&body);
        assert!(logged.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(logged.contains("500 bytes total"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("bad\nbody\t!"), "badbody!");
    }

    #[test]
    fn test_format_api_error_statuses() {
        let err = anyhow::anyhow!("API request failed: 401 Unauthorized");
        assert!(format_api_error(&err).starts_with("Authentication failed"));

        let err = anyhow::anyhow!("API request failed: 503 Service Unavailable");
        assert!(format_api_error(&err).starts_with("Backend temporarily unavailable"));

        let err = anyhow::anyhow!("API request failed: 418 I'm a teapot");
        assert!(format_api_error(&err).starts_with("Request failed"));
    }

    #[test]
    fn test_format_api_error_truncates_unknown() {
        let err = anyhow::anyhow!("{}", "e".repeat(120));
        let msg = format_api_error(&err);
        assert_eq!(msg.len(), 83);
        assert!(msg.ends_with("..."));
    }
}
