//! fieldsync command line
//!
//! Runs one sync pass between two JSON snapshot files:
//! 1. Loads the mapping manual
//! 2. Reads the records changed since `--from` on both sides
//! 3. Writes each side's order to its payload file
//!
//! Usage:
//!   fieldsync --manual crm.json --internal people.json --integration contacts.json \
//!             --from 2024-01-01T00:00:00Z
//!
//! The run result (orders and diagnostics) is printed to stdout as JSON.

use std::{path::PathBuf, sync::Arc};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use fieldsync_cli::{DEFAULT_TIMESTAMP_FIELD, JsonFileExchange, load_links, load_manual};
use fieldsync_sync::{Correlator, LatestChangeJudge, NoCorrelation, SyncConfig, SyncService};
use fieldsync_types::Side;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "fieldsync")]
#[command(about = "Bidirectional field-level sync between two JSON snapshots")]
struct Args {
    /// Mapping manual (JSON)
    #[arg(short, long)]
    manual: PathBuf,

    /// Internal side snapshot
    #[arg(long)]
    internal: PathBuf,

    /// Integration side snapshot
    #[arg(long)]
    integration: PathBuf,

    /// Only records changed at or after this instant (RFC 3339)
    #[arg(long, value_parser = parse_timestamp)]
    from: DateTime<Utc>,

    /// Known record pairs (JSON array of links); without it every record
    /// is created on the other side
    #[arg(long)]
    links: Option<PathBuf>,

    /// Where the internal side's order is written
    #[arg(long, default_value = "internal-order.json")]
    internal_out: PathBuf,

    /// Where the integration side's order is written
    #[arg(long, default_value = "integration-order.json")]
    integration_out: PathBuf,

    /// Record field holding the last change time
    #[arg(long, default_value = DEFAULT_TIMESTAMP_FIELD)]
    timestamp_field: String,

    /// Fetch timeout in milliseconds (0 waits indefinitely)
    #[arg(long, default_value = "30000")]
    timeout_ms: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let manual = Arc::new(load_manual(&args.manual)?);
    info!("fieldsync starting for {}", manual.integration());

    let internal = JsonFileExchange::new(Side::Internal, &args.internal, &args.internal_out)
        .with_types(manual.field_types(Side::Internal).clone())
        .with_timestamp_field(&args.timestamp_field);
    let integration =
        JsonFileExchange::new(Side::Integration, &args.integration, &args.integration_out)
            .with_name(manual.integration())
            .with_types(manual.field_types(Side::Integration).clone())
            .with_timestamp_field(&args.timestamp_field);

    let config = SyncConfig {
        fetch_timeout_ms: (args.timeout_ms > 0).then_some(args.timeout_ms),
        ..SyncConfig::default()
    };
    let correlator: Arc<dyn Correlator> = match &args.links {
        Some(path) => Arc::new(load_links(path)?),
        None => Arc::new(NoCorrelation),
    };
    let service = SyncService::new(Arc::new(LatestChangeJudge), correlator, config);

    let result = service
        .sync(&internal, &integration, manual, args.from)
        .await
        .context("Sync run failed")?;

    for diagnostic in &result.diagnostics {
        warn!("{}", diagnostic);
    }
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.delivered {
        anyhow::bail!("run {} was not fully delivered", result.run_id);
    }
    Ok(())
}
