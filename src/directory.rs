//! Remote directory abstraction
//!
//! The pipeline only needs two calls from the identity service: a
//! cursor-paginated principal listing and a per-principal group lookup.
//! [`Directory`] captures exactly that, so the orchestrator can run against
//! the IAM client in production and an in-memory fake in tests.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// A named identity returned by the listing call
///
/// # Examples
///
/// ```
/// use awsusers::directory::Principal;
///
/// let alice = Principal::new("alice");
/// assert_eq!(alice.name, "alice");
/// assert!(alice.arn.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Identifier, unique within the remote service
    pub name: String,
    /// Resource name, when the listing reports one
    pub arn: Option<String>,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: None,
        }
    }

    pub fn with_arn(mut self, arn: impl Into<String>) -> Self {
        self.arn = Some(arn.into());
        self
    }
}

/// One response unit of the paginated listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Principals in server order
    pub principals: Vec<Principal>,
    /// Present when more pages remain
    pub next_token: Option<String>,
}

impl Page {
    /// A page that ends the listing
    pub fn last(principals: Vec<Principal>) -> Self {
        Self {
            principals,
            next_token: None,
        }
    }

    /// A page followed by another one reachable through `token`
    pub fn with_next(principals: Vec<Principal>, token: impl Into<String>) -> Self {
        Self {
            principals,
            next_token: Some(token.into()),
        }
    }
}

/// Client for the remote identity service
///
/// Implementations own their transport, credentials and retry policy. The
/// pipeline treats every error returned here as final for that call.
pub trait Directory {
    /// Fetches the page following `token`, or the first page when `None`
    fn list_principals_page(
        &self,
        token: Option<String>,
    ) -> impl Future<Output = Result<Page>> + Send;

    /// Fetches the group names of one principal, in server order
    fn list_groups_for_principal(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;
}
