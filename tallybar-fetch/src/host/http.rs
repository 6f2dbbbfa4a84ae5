//! HTTP client with tracing and domain allowlist.
//!
//! This module provides a wrapped HTTP client that adds:
//! - Request/response tracing
//! - Domain allowlist for security
//! - Bearer-token and JSON helpers used by the API strategies

use reqwest::{Client, Response, header, header::HeaderMap};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::credentials::Credential;
use crate::error::HttpError;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for TallyBar.
const USER_AGENT: &str = concat!("TallyBar/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing and domain allowlist.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    allowed_domains: Option<Vec<String>>,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom timeout.
    ///
    /// Falls back to reqwest's default client if the configured one cannot
    /// be built.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::try_with_timeout(timeout).unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            Self::from_client(Client::new())
        })
    }

    /// Creates a client with a custom timeout, reporting build failures.
    pub fn try_with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self::from_client(client))
    }

    /// Creates a client for talking to a local language server over HTTPS
    /// with a self-signed certificate.
    ///
    /// Restricted to loopback hosts.
    pub fn local_insecure(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self::from_client(client)
            .restricted_to(vec!["127.0.0.1".to_string(), "localhost".to_string()]))
    }

    /// Wraps an existing reqwest client.
    pub fn from_client(inner: Client) -> Self {
        Self {
            inner,
            allowed_domains: None,
        }
    }

    /// Restricts requests to the given domains and their subdomains.
    pub fn restricted_to(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = Some(domains);
        self
    }

    /// Creates a new HTTP client with domain allowlist.
    pub fn with_allowed_domains(domains: Vec<String>) -> Self {
        Self::new().restricted_to(domains)
    }

    /// Checks if a URL's domain is allowed.
    fn is_domain_allowed(&self, url: &str) -> Result<(), HttpError> {
        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;

        let Some(ref allowed) = self.allowed_domains else {
            return Ok(());
        };

        let host = parsed
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl("No host in URL".to_string()))?;

        let allowed = allowed
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{domain}")));

        if allowed {
            Ok(())
        } else {
            Err(HttpError::DomainNotAllowed(host.to_string()))
        }
    }

    /// Performs a GET request.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<Response, HttpError> {
        self.is_domain_allowed(url)?;
        debug!("GET request");

        let response = self.inner.get(url).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Performs a GET request with a bearer credential.
    #[instrument(skip(self, credential), fields(url = %url))]
    pub async fn get_with_bearer(
        &self,
        url: &str,
        credential: &Credential,
    ) -> Result<Response, HttpError> {
        self.is_domain_allowed(url)?;
        debug!("GET request with bearer token");

        let response = self
            .inner
            .get(url)
            .header(header::AUTHORIZATION, credential.bearer())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Performs a POST request with JSON body and custom headers.
    #[instrument(skip(self, headers, body), fields(url = %url))]
    pub async fn post_json_with_headers<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &T,
    ) -> Result<Response, HttpError> {
        self.is_domain_allowed(url)?;
        debug!("POST request with JSON");

        let response = self.inner.post(url).headers(headers).json(body).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    /// Returns the inner reqwest client for advanced operations.
    pub fn inner(&self) -> &Client {
        &self.inner
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Response Extensions
// ============================================================================

/// Extension trait for Response handling.
pub trait ResponseExt {
    /// Check if the response indicates rate limiting.
    fn is_rate_limited(&self) -> bool;

    /// Check if the response rejected the credential.
    fn is_unauthorized(&self) -> bool;

    /// Get the Retry-After header value in seconds.
    fn retry_after_secs(&self) -> Option<u64>;
}

impl ResponseExt for Response {
    fn is_rate_limited(&self) -> bool {
        self.status() == reqwest::StatusCode::TOO_MANY_REQUESTS
    }

    fn is_unauthorized(&self) -> bool {
        matches!(
            self.status(),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
        )
    }

    fn retry_after_secs(&self) -> Option<u64> {
        self.headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }
}

// ============================================================================
// Tests
// ============================================================================
