//! Gatekeeper daemon
//!
//! Replays chat events, one JSON object per line, through the submission
//! and verification workflows. Outbound messages are printed to stdout as
//! JSON lines; logs go to stderr.

use clap::Parser;
use gatekeeper_daemon::{ConsoleTransport, DaemonResult, Gatekeeper, GatekeeperConfig};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Gatekeeper CLI
#[derive(Parser)]
#[command(name = "gatekeeperd")]
#[command(about = "Gatekeeper - community submission and verification workflows", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "GATEKEEPER_CONFIG")]
    config: Option<String>,

    /// JSON-lines event file; stdin when absent
    #[arg(short, long, env = "GATEKEEPER_EVENTS")]
    events: Option<String>,

    /// Log level, overriding the configuration
    #[arg(long, env = "GATEKEEPER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "GATEKEEPER_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    let config = GatekeeperConfig::load(cli.config.as_deref())?;

    // Initialize tracing
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());

    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        community = config.community.id,
        reviewer = config.community.reviewer,
        role = %config.community.role_name,
        "Starting gatekeeperd"
    );

    let gatekeeper = Gatekeeper::build(&config, Arc::new(ConsoleTransport::stdout()))?;

    let input: Box<dyn AsyncBufRead + Unpin + Send> = match &cli.events {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let summary = gatekeeper.replay(input).await?;

    info!(
        handled = summary.handled(),
        acknowledged = summary.acknowledged,
        rejected = summary.rejected,
        ignored = summary.ignored,
        malformed = summary.malformed,
        ledger_rows = gatekeeper.ledger_rows(),
        "Replay finished"
    );
    for orphan in gatekeeper.orphaned_rows() {
        error!(user = %orphan.user, row = orphan.row.row, reason = %orphan.reason, "Ledger row without role");
    }
    for failure in gatekeeper.drain_delivery_failures() {
        warn!(user = %failure.user, kind = %failure.kind, reason = %failure.reason, "Reviewer notice not delivered");
    }

    Ok(())
}
