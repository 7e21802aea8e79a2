use std::path::PathBuf;

use clap::Parser;
use derive_getters::Getters;

#[derive(Parser, Debug, Getters)]
#[command(name = "noise-maker")]
#[command(about = "Generate fake access-log CSV files for testing", long_about = None)]
pub struct CliArgs {
    #[arg(long, default_value = "logs.csv")]
    out: PathBuf,

    #[arg(long, default_value_t = 1000)]
    rows: usize,

    /// Seed for reproducible output; random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Timestamps are spread over the week following this instant.
    #[arg(long, default_value = "2024-01-01T00:00:00Z")]
    start: String,
}
