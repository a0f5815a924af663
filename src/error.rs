//! Error types for the audit pipeline and the IAM client
//!
//! `AuditError` covers the failures that halt a run: a listing page that
//! could not be fetched, a configuration that was rejected before any
//! remote call, or a sink that could not write the report. Per-principal
//! group fetch failures are not errors at this level; they are recorded as
//! [`crate::pipeline::FetchFailure`] entries in the report.
//!
//! `RemoteError` classifies what came back from the IAM endpoint so the
//! retry layer can decide whether another attempt is worthwhile.

use thiserror::Error;

/// Boxed underlying cause carried by pipeline errors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures that stop the audit pipeline
#[derive(Error, Debug)]
pub enum AuditError {
    /// A listing page failed; no partial listing is usable downstream
    #[error("failed to fetch listing page {page}: {source}")]
    Pagination {
        /// Zero-based index of the page that failed
        page: usize,
        #[source]
        source: BoxError,
    },

    /// Invalid pattern or concurrency limit, rejected before any remote call
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The report sink could not persist the final list
    #[error("failed to write report: {0}")]
    Report(#[source] BoxError),
}

/// Errors reported by the IAM Query API client
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The service answered with an `ErrorResponse` document
    #[error("{action} failed with HTTP {status}: {code}: {message}")]
    Api {
        action: String,
        status: u16,
        code: String,
        message: String,
    },

    /// Non-success status without a parseable error document
    #[error("{action} failed with HTTP {status}")]
    UnexpectedStatus { action: String, status: u16 },

    /// The body could not be interpreted as the expected response
    #[error("malformed {action} response: {reason}")]
    MalformedResponse { action: String, reason: String },
}

impl RemoteError {
    /// Whether a fresh attempt could plausibly succeed
    ///
    /// IAM reports throttling as HTTP 400 with code `Throttling`, so the
    /// error code is checked in addition to the status.
    pub fn is_retriable(&self) -> bool {
        match self {
            RemoteError::Api { status, code, .. } => {
                is_retriable_status(*status)
                    || matches!(
                        code.as_str(),
                        "Throttling" | "ServiceFailure" | "ServiceUnavailable"
                    )
            }
            RemoteError::UnexpectedStatus { status, .. } => is_retriable_status(*status),
            RemoteError::MalformedResponse { .. } => false,
        }
    }
}

fn is_retriable_status(status: u16) -> bool {
    // 429 is too many requests, 5xx may be transient
    status == 429 || (500..600).contains(&status)
}
