//! HTTP transport for the IAM Query API
//!
//! Every IAM action is a form-encoded `POST` to a single endpoint carrying
//! `Action` and `Version` plus action-specific parameters. This client:
//! - Reuses pooled keep-alive connections
//! - Retries throttling, server errors and transport failures with
//!   exponential backoff
//! - Turns `ErrorResponse` documents into [`RemoteError::Api`]
//!
//! Request signing is not done here. The endpoint is expected to accept the
//! requests as sent, typically a local SigV4 signing proxy in front of IAM.

use anyhow::{Context, Result};
use reqwest::{Client, ClientBuilder, Url};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::retry::{with_exponential_backoff, RetryConfig};
use crate::xml::parse_error_response;

/// IAM API version sent with every request
pub const IAM_API_VERSION: &str = "2010-05-08";

/// Client that posts IAM Query API actions to one endpoint
///
/// # Examples
///
/// ```
/// use awsusers::http::QueryClient;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = QueryClient::new("http://127.0.0.1:8080/", Duration::from_secs(5))?;
/// let xml = client.post_action("ListUsers", &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct QueryClient {
    client: Client,
    endpoint: Url,
    retry_config: RetryConfig,
}

impl QueryClient {
    /// Creates a client for `endpoint` with the given request timeout
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid IAM endpoint URL: {}", endpoint))?;

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("awsusers/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            retry_config: RetryConfig::default(),
        })
    }

    /// Replaces the retry configuration
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Posts `action` with `params` and returns the response body
    ///
    /// Retriable failures are retried according to the retry configuration;
    /// the last error is returned once attempts run out.
    pub async fn post_action(&self, action: &str, params: &[(&str, &str)]) -> Result<String> {
        let mut form: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 2);
        form.push(("Action", action));
        form.push(("Version", IAM_API_VERSION));
        form.extend_from_slice(params);

        debug!("Posting {} to {}", action, self.endpoint);

        with_exponential_backoff(
            || self.send_once(action, &form),
            is_retriable,
            &self.retry_config,
        )
        .await
    }

    async fn send_once(&self, action: &str, form: &[(&str, &str)]) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .form(form)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", action))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read {} response body", action))?;

        if status.is_success() {
            return Ok(body);
        }

        let error = match parse_error_response(&body) {
            Some((code, message)) => RemoteError::Api {
                action: action.to_string(),
                status: status.as_u16(),
                code,
                message,
            },
            None => RemoteError::UnexpectedStatus {
                action: action.to_string(),
                status: status.as_u16(),
            },
        };

        if error.is_retriable() {
            warn!("{}, will retry", error);
        } else {
            debug!("Non-retriable failure: {}", error);
        }

        Err(error.into())
    }
}

/// Decides whether a failed attempt should be repeated
///
/// Classified remote errors decide for themselves; transport errors are
/// retried on timeouts and connection failures only.
fn is_retriable(err: &anyhow::Error) -> bool {
    if let Some(remote) = err.downcast_ref::<RemoteError>() {
        return remote.is_retriable();
    }

    err.chain()
        .filter_map(|e| e.downcast_ref::<reqwest::Error>())
        .any(|e| e.is_timeout() || e.is_connect())
}
