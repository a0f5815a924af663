//! Report rendering and persistence
//!
//! The pipeline hands its final list to a [`ReportSink`]. [`FileSink`]
//! renders one record per principal, either as CSV (name and lookup URL) or
//! as pretty-printed JSON, and writes it to a file.

use anyhow::{Context, Result};
use clap::ValueEnum;
use reqwest::Url;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use tracing::info;

use crate::pipeline::{AuditEntry, AuditReport};

/// Default search page used to build per-principal lookup links
pub const DEFAULT_LOOKUP_URL: &str = "https://www.office.com/search";

/// Receives the final, filtered report
pub trait ReportSink {
    fn write_report(&self, report: &AuditReport) -> impl Future<Output = Result<()>> + Send;
}

/// Output encodings supported by [`FileSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// `name,lookup-url` per line
    #[default]
    Csv,
    /// Array of entries with groups and lookup URL
    Json,
}

/// One principal as written in JSON output
#[derive(Debug, Serialize)]
struct JsonRecord<'a> {
    name: &'a str,
    arn: Option<&'a str>,
    groups: Option<&'a [String]>,
    lookup_url: String,
}

/// Writes the report to a file
///
/// # Examples
///
/// ```
/// use awsusers::directory::Principal;
/// use awsusers::pipeline::{AuditEntry, AuditReport};
/// use awsusers::report::{FileSink, OutputFormat};
///
/// let sink = FileSink::new("awsusers.csv", OutputFormat::Csv, "https://www.office.com/search").unwrap();
/// let report = AuditReport {
///     entries: vec![AuditEntry { principal: Principal::new("alice"), groups: None }],
///     failures: vec![],
/// };
/// assert_eq!(
///     sink.render(&report).unwrap(),
///     "alice,https://www.office.com/search?q=alice"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    format: OutputFormat,
    lookup_base: Url,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, format: OutputFormat, lookup_base: &str) -> Result<Self> {
        let lookup_base = Url::parse(lookup_base)
            .with_context(|| format!("Invalid lookup URL: {}", lookup_base))?;

        Ok(Self {
            path: path.into(),
            format,
            lookup_base,
        })
    }

    /// Lookup link for one principal, with the name URL-encoded as `q`
    ///
    /// The name is form-encoded, not written raw: `kevin.f@corp.com` becomes
    /// `q=kevin.f%40corp.com` and a space becomes `+`. Search pages decode it
    /// back to the original name.
    pub fn lookup_url(&self, name: &str) -> String {
        let mut url = self.lookup_base.clone();
        url.query_pairs_mut().append_pair("q", name);
        url.to_string()
    }

    /// Renders the report in the configured format
    pub fn render(&self, report: &AuditReport) -> Result<String> {
        match self.format {
            OutputFormat::Csv => Ok(report
                .entries
                .iter()
                .map(|entry| {
                    format!(
                        "{},{}",
                        csv_field(&entry.principal.name),
                        csv_field(&self.lookup_url(&entry.principal.name))
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Json => {
                let records: Vec<JsonRecord<'_>> =
                    report.entries.iter().map(|e| self.json_record(e)).collect();
                serde_json::to_string_pretty(&records).context("Failed to serialize report")
            }
        }
    }

    fn json_record<'a>(&self, entry: &'a AuditEntry) -> JsonRecord<'a> {
        JsonRecord {
            name: &entry.principal.name,
            arn: entry.principal.arn.as_deref(),
            groups: entry.groups.as_deref(),
            lookup_url: self.lookup_url(&entry.principal.name),
        }
    }
}

impl ReportSink for FileSink {
    async fn write_report(&self, report: &AuditReport) -> Result<()> {
        let label = match self.format {
            OutputFormat::Csv => "CSV",
            OutputFormat::Json => "JSON",
        };
        info!("Generating {} output file...", label);

        let contents = self.render(report)?;
        tokio::fs::write(&self.path, contents)
            .await
            .with_context(|| format!("Failed to write output file {}", self.path.display()))?;

        info!(
            "Generating {} output file [CREATED {}]",
            label,
            self.path.display()
        );
        Ok(())
    }
}

/// Quotes a CSV field when it contains a separator, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
