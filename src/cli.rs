//! Command-line interface for the awsusers audit tool
//!
//! Flags map onto three pieces of configuration:
//!
//! - Pipeline: name patterns (`-u`), group patterns (`-g`), concurrency cap
//! - Directory client: IAM endpoint and request timeout
//! - Report sink: output path, format and lookup URL
//!
//! `-u` and `-g` each take one or more regular expressions, so both
//! `-u '^svc-' '^ci-'` and `-u '^svc-' -u '^ci-'` work. Patterns inside one
//! flag are OR-combined.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{AuditConfig, DEFAULT_CONCURRENCY};
use crate::report::{OutputFormat, DEFAULT_LOOKUP_URL};

/// Main command-line interface structure
///
/// # Examples
///
/// ```
/// use awsusers::cli::Cli;
/// use clap::Parser;
///
/// let cli = Cli::try_parse_from(["awsusers", "-u", "^a", "^c", "-g", "^adm"]).unwrap();
/// assert_eq!(cli.user_filters, vec!["^a", "^c"]);
/// assert_eq!(cli.group_filters, vec!["^adm"]);
/// assert_eq!(cli.concurrency, 10);
/// ```
#[derive(Parser, Debug)]
#[command(
    name = "awsusers",
    about = "List IAM users, optionally filtered by user name and group membership",
    version
)]
pub struct Cli {
    /// Regular expressions matching user names
    #[arg(short = 'u', long = "user", value_name = "REGEX", num_args = 1..)]
    pub user_filters: Vec<String>,

    /// Regular expressions matching group names; enables group lookups
    #[arg(short = 'g', long = "group", value_name = "REGEX", num_args = 1..)]
    pub group_filters: Vec<String>,

    /// Maximum number of group lookups in flight
    /// Higher values finish sooner but may trigger IAM throttling
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Request timeout in milliseconds
    #[arg(short = 't', long, default_value = "5000")]
    pub timeout_ms: u64,

    /// IAM Query API endpoint, usually a local request-signing proxy
    #[arg(short = 'e', long, default_value = "http://127.0.0.1:8080/")]
    pub endpoint: String,

    /// File the report is written to
    #[arg(short = 'o', long, default_value = "awsusers.csv")]
    pub output: PathBuf,

    /// Report format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,

    /// Search page linked for each user; the name is appended as `q`
    #[arg(long, default_value = DEFAULT_LOOKUP_URL)]
    pub lookup_url: String,

    /// Do not render progress while fetching groups
    #[arg(long)]
    pub no_progress: bool,
}

impl Cli {
    /// Pipeline options carried by the command line
    pub fn audit_config(&self) -> AuditConfig {
        AuditConfig {
            name_filters: self.user_filters.clone(),
            group_filters: self.group_filters.clone(),
            concurrency_limit: self.concurrency,
        }
    }
}
