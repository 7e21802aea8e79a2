mod args;
mod generator;
mod writer;

use args::CliArgs;
use chrono::{DateTime, Utc};
use clap::Parser;
use writer::write_rows;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = CliArgs::parse();
    let start = match DateTime::parse_from_rfc3339(args.start()) {
        Ok(ts) => ts.with_timezone(&Utc),
        Err(err) => {
            eprintln!("invalid --start: {err}");
            std::process::exit(1);
        }
    };

    println!("Writing {} rows to {}", args.rows(), args.out().display());
    if let Err(err) = write_rows(args.out(), *args.rows(), start, *args.seed()).await {
        eprintln!("failed to write {}: {err}", args.out().display());
        std::process::exit(1);
    }
}
