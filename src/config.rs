//! Pipeline configuration and its validation
//!
//! [`AuditConfig`] holds raw user input. [`AuditConfig::validate`] compiles
//! the patterns and checks the concurrency limit, producing a
//! [`ValidatedConfig`] that the orchestrator accepts. Validation happens
//! before any client is contacted.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

use crate::error::AuditError;
use crate::filter::PatternSet;

/// Default number of group lookups in flight, low enough to stay clear of
/// IAM throttling
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Raw pipeline options
///
/// # Examples
///
/// ```
/// use awsusers::config::AuditConfig;
///
/// let config = AuditConfig {
///     name_filters: vec!["^svc-".to_string()],
///     ..AuditConfig::default()
/// };
/// let validated = config.validate().unwrap();
/// assert_eq!(validated.concurrency_limit.get(), 10);
/// assert!(validated.group_filters.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Name patterns; empty disables name filtering
    pub name_filters: Vec<String>,
    /// Group patterns; empty disables group fetching entirely
    pub group_filters: Vec<String>,
    /// Maximum concurrent group lookups
    pub concurrency_limit: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            name_filters: Vec::new(),
            group_filters: Vec::new(),
            concurrency_limit: DEFAULT_CONCURRENCY,
        }
    }
}

/// Configuration that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub name_filters: PatternSet,
    pub group_filters: PatternSet,
    pub concurrency_limit: NonZeroUsize,
}

impl AuditConfig {
    /// Compiles patterns and checks limits
    ///
    /// Returns [`AuditError::Configuration`] naming the offending option for
    /// a malformed regular expression or a concurrency limit below 1.
    pub fn validate(&self) -> Result<ValidatedConfig, AuditError> {
        let concurrency_limit = NonZeroUsize::new(self.concurrency_limit).ok_or_else(|| {
            AuditError::Configuration("concurrency limit must be at least 1".to_string())
        })?;

        Ok(ValidatedConfig {
            name_filters: compile("name", &self.name_filters)?,
            group_filters: compile("group", &self.group_filters)?,
            concurrency_limit,
        })
    }
}

fn compile(kind: &str, patterns: &[String]) -> Result<PatternSet, AuditError> {
    PatternSet::new(patterns).map_err(|e| {
        AuditError::Configuration(format!("invalid {} filter pattern: {}", kind, e))
    })
}
