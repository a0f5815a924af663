use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::time::Duration;

use tokio::runtime::Builder;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use awsusers::cli::Cli;
use awsusers::iam::IamDirectory;
use awsusers::pipeline::Auditor;
use awsusers::progress::{BarReporter, LogReporter, ProgressReporter, SilentReporter};
use awsusers::report::FileSink;

fn main() -> Result<()> {
    // All concurrency is interleaved I/O in one task, a single thread is enough
    let runtime = Builder::new_current_thread().enable_all().build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Reject bad patterns before anything touches the network
    let config = cli.audit_config().validate()?;

    let directory = IamDirectory::new(&cli.endpoint, Duration::from_millis(cli.timeout_ms))?;
    let sink = FileSink::new(&cli.output, cli.format, &cli.lookup_url)?;

    let progress: Box<dyn ProgressReporter> = if cli.no_progress {
        Box::new(SilentReporter)
    } else if std::io::stderr().is_terminal() {
        Box::new(BarReporter::new())
    } else {
        Box::new(LogReporter::new())
    };

    let auditor = Auditor::new(&directory, config);
    let config = auditor.config();
    debug!(
        "Name filters: {:?}, group filters: {:?}, concurrency: {}",
        config.name_filters.patterns(),
        config.group_filters.patterns(),
        config.concurrency_limit
    );

    auditor.run(progress.as_ref(), &sink).await?;

    Ok(())
}
