mod analytics;
mod ingest;
mod invariants;
mod models;
mod query;
mod snapshot;
mod store;

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ingest::{IngestError, ParsePolicy};
use snapshot::SnapshotError;
use store::{Store, StoreError};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Delimited source file with URL, IP, timeStamp and timeSpent columns.
    #[arg(long, default_value = "logs.csv")]
    source: PathBuf,

    /// Intermediate snapshot written by `convert` and read by `import`.
    #[arg(long, default_value = "logs.json")]
    snapshot: PathBuf,

    /// Entry store file.
    #[arg(long, default_value = "logs.db")]
    db: PathBuf,

    /// What to do with rows that fail normalization.
    #[arg(long, value_enum, default_value_t = ParsePolicy::Reject)]
    on_parse_error: ParsePolicy,

    /// Deadline for a single store operation, in seconds.
    #[arg(long, default_value_t = 30)]
    store_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize the source file into the snapshot.
    Convert,
    /// Load the snapshot into the store as one batch.
    Import,
    /// List every distinct URL in the store.
    Urls,
    /// List the IPs that visited a URL.
    Ips { url: String },
    /// List URLs visited between two instants, boundaries included.
    Range { start: String, end: String },
    /// List URLs visited from an IP.
    Byip { ip: String },
    /// Total duration per URL, heaviest first.
    AggDuration,
    /// Visit count per URL, most visited first.
    AggVisits,
    /// Visits per URL per calendar day over a range, boundaries included.
    AggDaily { start: String, end: String },
    /// Visit count and duration sum per IP.
    AggIp,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unparseable instant `{0}`")]
    BadInstant(String),
    #[error("bulk insert stopped at entry {index} of {attempted} ({inserted} inserted): {message}")]
    PartialImport {
        attempted: usize,
        inserted: usize,
        index: usize,
        message: String,
    },
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let store = Store::new(&args.db, Duration::from_secs(args.store_timeout_secs));
    match args.command {
        Command::Convert => convert(&args).await,
        Command::Import => import(&args, &store).await,
        Command::Urls => {
            for url in query::all_urls(&store).await? {
                println!("{url}");
            }
            Ok(())
        }
        Command::Ips { url } => {
            for ip in query::ips_for_url(&store, &url).await? {
                println!("{ip}");
            }
            Ok(())
        }
        Command::Range { start, end } => {
            let (start, end) = (parse_cli_instant(&start)?, parse_cli_instant(&end)?);
            for url in query::urls_in_range(&store, start, end).await? {
                println!("{url}");
            }
            Ok(())
        }
        Command::Byip { ip } => {
            for url in query::urls_for_ip(&store, &ip).await? {
                println!("{url}");
            }
            Ok(())
        }
        Command::AggDuration => {
            for row in analytics::total_duration_by_url(&store).await? {
                println!("{}\t{}", row.url, row.total_duration);
            }
            Ok(())
        }
        Command::AggVisits => {
            for row in analytics::visit_count_by_url(&store).await? {
                println!("{}\t{}", row.url, row.visits);
            }
            Ok(())
        }
        Command::AggDaily { start, end } => {
            let (start, end) = (parse_cli_instant(&start)?, parse_cli_instant(&end)?);
            for row in analytics::visits_per_day(&store, start, end).await? {
                println!("{}\t{}\t{}", row.url, row.day, row.visits);
            }
            Ok(())
        }
        Command::AggIp => {
            for row in analytics::stats_by_ip(&store).await? {
                println!("{}\t{}\t{}", row.ip, row.visits, row.total_duration);
            }
            Ok(())
        }
    }
}

async fn convert(args: &Args) -> Result<(), AppError> {
    let report = ingest::read_source(&args.source, args.on_parse_error).await?;
    snapshot::write(&args.snapshot, &report.entries).await?;
    info!(
        rows = report.entries.len(),
        skipped = report.skipped,
        snapshot = %args.snapshot.display(),
        "source converted"
    );
    println!(
        "Converted {} rows to {}",
        report.entries.len(),
        args.snapshot.display()
    );
    if report.skipped > 0 {
        println!("Skipped {} malformed rows", report.skipped);
    }
    Ok(())
}

async fn import(args: &Args, store: &Store) -> Result<(), AppError> {
    let entries = snapshot::read(&args.snapshot).await?;
    let report = store.insert_batch(entries).await?;
    if let Some(failure) = report.first_failure {
        return Err(AppError::PartialImport {
            attempted: report.attempted,
            inserted: report.inserted,
            index: failure.index,
            message: failure.message,
        });
    }
    info!(inserted = report.inserted, db = %args.db.display(), "entries inserted");
    println!("Inserted {} entries into {}", report.inserted, args.db.display());
    Ok(())
}

fn parse_cli_instant(text: &str) -> Result<DateTime<Utc>, AppError> {
    ingest::parse_instant(text).ok_or_else(|| AppError::BadInstant(text.to_string()))
}
