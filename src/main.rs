use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tsunagi::cli::{self, Cli};
use tsunagi::{ConsoleReporter, MemoryConnector};

/// Installs the log subscriber on stderr, keeping stdout for the run's output.
///
/// `RUST_LOG` wins over `--log-level` when set.
fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    tracing::debug!("tsunagi starting with args: {:?}", cli);

    let outcome = cli::run(
        &cli,
        Arc::new(MemoryConnector::new()),
        Arc::new(ConsoleReporter::stdout()),
    )
    .await?;

    tracing::debug!("tsunagi finished: {:?}", outcome);
    Ok(())
}
