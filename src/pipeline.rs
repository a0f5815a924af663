//! Audit pipeline orchestration
//!
//! The [`Auditor`] drives one run through these stages:
//!
//! ```text
//! Listing -> [NameFiltering] -> [GroupFetching -> GroupFiltering] -> Reporting -> Done
//! ```
//!
//! Name filtering runs only when name patterns are configured. Group
//! fetching and group filtering run only when group patterns are
//! configured; without them no per-principal call is made at all.
//!
//! Group lookups go through the bounded worker pool, so the number of
//! concurrent calls against the directory never exceeds the configured
//! limit. A failed lookup does not stop the run: the principal is treated
//! as having no groups, and the failure is listed in the report.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::ValidatedConfig;
use crate::directory::{Directory, Principal};
use crate::error::AuditError;
use crate::filter::{matches_any, matches_by_association};
use crate::paginator::fetch_all;
use crate::pool::run_pool;
use crate::progress::ProgressReporter;
use crate::report::ReportSink;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Listing,
    NameFiltering,
    GroupFetching,
    GroupFiltering,
    Reporting,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Listing => "listing",
            Stage::NameFiltering => "name filtering",
            Stage::GroupFetching => "group fetching",
            Stage::GroupFiltering => "group filtering",
            Stage::Reporting => "reporting",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// One principal kept by the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub principal: Principal,
    /// Group names, when the group stages ran
    pub groups: Option<Vec<String>>,
}

/// A group lookup that failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    /// Position of the principal in the group fetch input
    pub index: usize,
    pub principal: String,
    pub message: String,
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    /// Principals that passed every active filter, in listing order
    pub entries: Vec<AuditEntry>,
    /// Group lookups that failed; empty unless the group stages ran
    pub failures: Vec<FetchFailure>,
}

impl AuditReport {
    pub fn names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.principal.name.as_str())
            .collect()
    }
}

/// Runs the listing, filtering and group resolution against a directory
///
/// # Examples
///
/// ```no_run
/// use awsusers::config::AuditConfig;
/// use awsusers::iam::IamDirectory;
/// use awsusers::pipeline::Auditor;
/// use awsusers::progress::SilentReporter;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = AuditConfig {
///     group_filters: vec!["^adm".to_string()],
///     ..AuditConfig::default()
/// }
/// .validate()?;
/// let directory = IamDirectory::new("http://127.0.0.1:8080/", Duration::from_secs(5))?;
///
/// let report = Auditor::new(&directory, config).collect(&SilentReporter).await?;
/// println!("{} admins", report.entries.len());
/// # Ok(())
/// # }
/// ```
pub struct Auditor<'a, C> {
    directory: &'a C,
    config: ValidatedConfig,
}

impl<'a, C: Directory> Auditor<'a, C> {
    pub fn new(directory: &'a C, config: ValidatedConfig) -> Self {
        Self { directory, config }
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Runs every stage and hands the report to `sink`
    pub async fn run<P, S>(&self, progress: &P, sink: &S) -> Result<AuditReport, AuditError>
    where
        P: ProgressReporter + ?Sized,
        S: ReportSink,
    {
        let report = self.collect(progress).await?;

        enter(Stage::Reporting);
        sink.write_report(&report)
            .await
            .map_err(|e| AuditError::Report(e.into()))?;

        enter(Stage::Done);
        Ok(report)
    }

    /// Runs every stage up to reporting and returns the result
    pub async fn collect<P>(&self, progress: &P) -> Result<AuditReport, AuditError>
    where
        P: ProgressReporter + ?Sized,
    {
        enter(Stage::Listing);
        info!("Requesting users...");
        let directory = self.directory;
        let mut principals =
            fetch_all(|token| directory.list_principals_page(token)).await?;
        info!("{} users fetched.", principals.len());

        let name_filters = &self.config.name_filters;
        if !name_filters.is_empty() {
            enter(Stage::NameFiltering);
            principals.retain(|p| matches_any(&p.name, name_filters));
            info!("{} users with matching name.", principals.len());
        }

        if self.config.group_filters.is_empty() {
            return Ok(AuditReport {
                entries: principals
                    .into_iter()
                    .map(|principal| AuditEntry {
                        principal,
                        groups: None,
                    })
                    .collect(),
                failures: Vec::new(),
            });
        }

        enter(Stage::GroupFetching);
        info!("Retrieving users groups...");
        let names: Vec<String> = principals.iter().map(|p| p.name.clone()).collect();
        let results = run_pool(
            names,
            self.config.concurrency_limit,
            |name| async move { directory.list_groups_for_principal(&name).await },
            progress,
        )
        .await;

        enter(Stage::GroupFiltering);
        let group_filters = &self.config.group_filters;
        let mut report = AuditReport::default();

        for (index, (principal, result)) in principals.into_iter().zip(results).enumerate() {
            match result {
                Ok(groups) => {
                    if matches_by_association(&groups, group_filters) {
                        report.entries.push(AuditEntry {
                            principal,
                            groups: Some(groups),
                        });
                    }
                }
                Err(e) => {
                    debug!("Group lookup failed for {}: {:#}", principal.name, e);
                    report.failures.push(FetchFailure {
                        index,
                        principal: principal.name,
                        message: format!("{:#}", e),
                    });
                }
            }
        }

        info!("{} users with matching groups.", report.entries.len());
        if !report.failures.is_empty() {
            warn!(
                "{} group lookups failed; those users were treated as having no groups",
                report.failures.len()
            );
            for failure in &report.failures {
                warn!("  {}: {}", failure.principal, failure.message);
            }
        }

        Ok(report)
    }
}

fn enter(stage: Stage) {
    debug!("Entering stage: {}", stage);
}
