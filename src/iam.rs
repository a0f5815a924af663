//! [`Directory`] implementation backed by the IAM Query API

use anyhow::Result;
use std::time::Duration;

use crate::directory::{Directory, Page};
use crate::error::RemoteError;
use crate::http::QueryClient;
use crate::retry::RetryConfig;
use crate::xml::{parse_list_groups_for_user, parse_list_users};

/// IAM users and their groups, fetched through a [`QueryClient`]
///
/// Construct one per run and pass it by reference to the orchestrator.
pub struct IamDirectory {
    client: QueryClient,
}

impl IamDirectory {
    /// Connects to `endpoint` with the given per-request timeout
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: QueryClient::new(endpoint, timeout)?,
        })
    }

    /// Wraps an existing query client
    pub fn from_client(client: QueryClient) -> Self {
        Self { client }
    }

    /// Replaces the retry configuration of the underlying client
    pub fn with_retry_config(self, config: RetryConfig) -> Self {
        Self {
            client: self.client.with_retry_config(config),
        }
    }
}

impl Directory for IamDirectory {
    async fn list_principals_page(&self, token: Option<String>) -> Result<Page> {
        let params: Vec<(&str, &str)> = match token.as_deref() {
            Some(marker) => vec![("Marker", marker)],
            None => Vec::new(),
        };

        let body = self.client.post_action("ListUsers", &params).await?;
        parse_list_users(&body).map_err(|e| malformed("ListUsers", e))
    }

    async fn list_groups_for_principal(&self, name: &str) -> Result<Vec<String>> {
        let body = self
            .client
            .post_action("ListGroupsForUser", &[("UserName", name)])
            .await?;
        parse_list_groups_for_user(&body).map_err(|e| malformed("ListGroupsForUser", e))
    }
}

fn malformed(action: &str, err: anyhow::Error) -> anyhow::Error {
    RemoteError::MalformedResponse {
        action: action.to_string(),
        reason: format!("{:#}", err),
    }
    .into()
}
