// awsusers: IAM user audit
// Exposes the pipeline building blocks as a library; the binary wires them to the CLI

pub mod cli;
pub mod config;
pub mod directory;
pub mod error;
pub mod filter;
pub mod http;
pub mod iam;
pub mod paginator;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod report;
pub mod retry;
pub mod xml;
