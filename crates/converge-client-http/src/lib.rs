// # HTTP Resource Client
//
// This crate provides a ResourceClient implementation for a generic
// JSON-over-HTTP resource API.
//
// ## API shape
//
// The remote collection is addressed by a base URL; resources live under
// it by name (for reads) or remote identity (for mutations):
//
// - `GET    {base}/{name}`      → 200 `{"id": ..., "properties": {...}}`,
//                                 404 means genuinely absent
// - `POST   {base}`             → create, body `{"name", "properties"}`
// - `DELETE {base}/{identity}`  → delete
// - `PATCH  {base}/{identity}`  → in-place update, body `{"properties"}`
//
// ## Division of responsibility
//
// One HTTP request per trait method. No retry, no backoff, no caching,
// no background tasks; all of that is owned by the engine's caller.
// Dry-run never reaches this crate: the engine suppresses mutating calls
// before they get here.
//
// ## Security
//
// The bearer token never appears in logs; the Debug implementation
// redacts it.

use async_trait::async_trait;
use converge_core::config::{ClientBackend, ClientConfig};
use converge_core::registry::ClientRegistry;
use converge_core::resource::{ObservedState, Properties};
use converge_core::traits::{ResourceClient, ResourceClientFactory};
use converge_core::{Error, Result};
use serde_json::{Value, json};
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Resource client for a generic JSON-over-HTTP resource API
pub struct HttpResourceClient {
    /// Collection base URL, without trailing slash
    base_url: String,

    /// Bearer token, never logged
    api_token: Option<String>,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the bearer token
impl std::fmt::Debug for HttpResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResourceClient")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl HttpResourceClient {
    /// Create a new HTTP resource client
    ///
    /// # Parameters
    ///
    /// - `base_url`: collection base URL
    /// - `api_token`: optional bearer token
    /// - `timeout`: request timeout; defaults to 30 seconds
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.is_empty() {
            return Err(Error::config("HTTP client base URL cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            client,
        })
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");
        if let Some(ref token) = self.api_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn resource_url(&self, suffix: &str) -> String {
        format!("{}/{}", self.base_url, suffix)
    }
}

/// Describe an error response in terms a human can act on
///
/// Maps the status classes the remote can reasonably return; everything
/// else falls through with the raw status and body.
fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    match status.as_u16() {
        401 | 403 => format!(
            "authentication failed: invalid token or insufficient permissions (status {})",
            status
        ),
        429 => format!("rate limit exceeded, retry later (status {})", status),
        500..=599 => format!("server error (transient): {} - {}", status, body),
        _ => format!("unexpected response: {} - {}", status, body),
    }
}

/// Parse an observed resource out of a response body
fn parse_observed(body: &Value) -> Result<ObservedState> {
    let identity = match &body["id"] {
        Value::String(id) => id.clone(),
        Value::Number(id) => id.to_string(),
        _ => {
            return Err(Error::query(
                "malformed response: id is neither string nor number",
            ));
        }
    };

    let properties = match &body["properties"] {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::Null => Properties::new(),
        _ => {
            return Err(Error::query(
                "malformed response: properties is not an object",
            ));
        }
    };

    Ok(ObservedState::Present {
        identity,
        properties,
    })
}

/// Parse the applied-properties echo from a mutation response body
fn parse_applied(body: &Value) -> Properties {
    match &body["properties"] {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        _ => Properties::new(),
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn get(&self, name: &str) -> Result<ObservedState> {
        let url = self.resource_url(name);
        tracing::debug!("GET {}", url);

        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| Error::query(format!("GET {} failed: {}", url, e)))?;

        // 404 is the one status that means genuine absence.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(ObservedState::Absent);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::query(describe_failure(status, &body)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::query(format!("failed to parse response: {}", e)))?;
        parse_observed(&body)
    }

    async fn create(&self, name: &str, properties: &Properties) -> Result<Properties> {
        let url = self.base_url.clone();
        tracing::debug!("POST {} ({})", url, name);

        let payload = json!({ "name": name, "properties": properties });
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::mutation(format!("POST {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::mutation(describe_failure(status, &body)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::mutation(format!("failed to parse response: {}", e)))?;
        Ok(parse_applied(&body))
    }

    async fn delete(&self, identity: &str) -> Result<()> {
        let url = self.resource_url(identity);
        tracing::debug!("DELETE {}", url);

        let response = self
            .request(reqwest::Method::DELETE, &url)
            .send()
            .await
            .map_err(|e| Error::mutation(format!("DELETE {} failed: {}", url, e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::mutation(format!(
                "no resource with identity {}",
                identity
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::mutation(describe_failure(status, &body)));
        }

        Ok(())
    }

    async fn update(&self, identity: &str, delta: &Properties) -> Result<Properties> {
        let url = self.resource_url(identity);
        tracing::debug!("PATCH {} ({} properties)", url, delta.len());

        let payload = json!({ "properties": delta });
        let response = self
            .request(reqwest::Method::PATCH, &url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::mutation(format!("PATCH {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::mutation(describe_failure(status, &body)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::mutation(format!("failed to parse response: {}", e)))?;
        let applied = parse_applied(&body);
        Ok(if applied.is_empty() {
            delta.clone()
        } else {
            applied
        })
    }

    fn supports_update(&self) -> bool {
        true
    }

    fn client_name(&self) -> &'static str {
        "http"
    }
}

/// Factory for the HTTP backend
pub struct HttpClientFactory;

impl ResourceClientFactory for HttpClientFactory {
    fn create(&self, config: &ClientConfig) -> Result<Box<dyn ResourceClient>> {
        let ClientBackend::Http {
            base_url,
            api_token,
            timeout_secs,
        } = &config.backend
        else {
            return Err(Error::config(format!(
                "http factory received a {} backend config",
                config.backend.type_name()
            )));
        };

        let client = HttpResourceClient::new(
            base_url.clone(),
            api_token.clone(),
            timeout_secs.map(Duration::from_secs),
        )?;
        Ok(Box::new(client))
    }
}

/// Register the HTTP backend with a registry
pub fn register(registry: &ClientRegistry) {
    registry.register_client("http", Box::new(HttpClientFactory));
}
