//! NSX-T Manager REST Client
//!
//! Native REST implementation of [`PolicyStoreClient`] for the NSX-T manager API.
//! Uses reqwest (rustls) for HTTP requests and basic auth against the manager.
//!
//! References:
//! - [NSX-T Data Center REST API](https://developer.vmware.com/apis/nsx-t)

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::{NsxErrorResponse, PolicyStoreClient, TransportError};
use crate::config::DfwConfig;

/// NSX-T manager REST client
pub struct NsxRestClient {
    http_client: Client,
    base_url: String,
    user: String,
    password: Zeroizing<String>,
}

impl std::fmt::Debug for NsxRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NsxRestClient")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl NsxRestClient {
    /// Create a new NSX REST client from configuration
    ///
    /// # Errors
    /// Returns an error if the manager URL is missing or the HTTP client cannot be built
    pub fn new(config: &DfwConfig) -> Result<Self> {
        let base_url = config
            .manager_url
            .clone()
            .context("NSX_MANAGER_URL is not set")?;

        info!("Initializing NSX REST client for manager: {}", base_url);
        if !config.verify_tls {
            warn!("TLS certificate verification is disabled for {}", base_url);
        }

        // Create HTTP client with rustls (already configured in Cargo.toml)
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url,
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    /// Build HTTP request with authentication headers
    fn make_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .http_client
            .request(method, &url)
            .basic_auth(&self.user, Some(self.password.as_str()))
            .header("Accept", "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        request
    }

    /// Send a request and hand back status plus raw body
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, String), TransportError> {
        debug!("NSX {} {}", method, path);
        let response = self.make_request(method, path, body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }

    /// Map a non-success answer to a transport error
    fn handle_error_response(status: StatusCode, error_text: &str) -> TransportError {
        let message = NsxErrorResponse::describe(error_text);
        match status {
            StatusCode::PRECONDITION_FAILED | StatusCode::CONFLICT => TransportError::Conflict {
                status: status.as_u16(),
                message,
            },
            _ => TransportError::Status {
                status: status.as_u16(),
                message,
            },
        }
    }

    fn parse_body(text: &str) -> Result<Value, TransportError> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(text)?)
    }
}

#[async_trait]
impl PolicyStoreClient for NsxRestClient {
    async fn get(&self, path: &str) -> Result<Option<Value>, TransportError> {
        let (status, text) = self.send(Method::GET, path, None).await?;
        match status {
            status if status.is_success() => Ok(Some(Self::parse_body(&text)?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(Self::handle_error_response(status, &text)),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        let (status, text) = self.send(Method::POST, path, Some(body)).await?;
        if !status.is_success() {
            return Err(Self::handle_error_response(status, &text));
        }
        Self::parse_body(&text)
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        let (status, text) = self.send(Method::PUT, path, Some(body)).await?;
        if !status.is_success() {
            return Err(Self::handle_error_response(status, &text));
        }
        Self::parse_body(&text)
    }

    async fn delete(&self, path: &str) -> Result<(), TransportError> {
        let (status, text) = self.send(Method::DELETE, path, None).await?;
        match status {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!("NSX DELETE {} answered 404, treating as already absent", path);
                Ok(())
            }
            status => Err(Self::handle_error_response(status, &text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_manager_url() {
        let err = NsxRestClient::new(&DfwConfig::default()).unwrap_err();
        assert!(err.to_string().contains("NSX_MANAGER_URL"));
    }

    #[test]
    fn test_precondition_failed_is_conflict() {
        let err = NsxRestClient::handle_error_response(StatusCode::PRECONDITION_FAILED, "{}");
        assert!(err.is_conflict());
        let err = NsxRestClient::handle_error_response(StatusCode::BAD_REQUEST, "bad");
        assert!(!err.is_conflict());
        assert_eq!(err.to_string(), "HTTP 400: bad");
    }

    #[test]
    fn test_empty_body_is_null() {
        assert_eq!(NsxRestClient::parse_body("  ").unwrap(), Value::Null);
    }
}
