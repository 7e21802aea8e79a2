use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use rand::{SeedableRng, rngs::StdRng};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::generator::{HEADER, generate_row};

const WRITE_BATCH_ROWS: usize = 10_000;

pub async fn write_rows(
    path: &Path,
    rows: usize,
    start: DateTime<Utc>,
    seed: Option<u64>,
) -> io::Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let file = File::create(path).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(HEADER.as_bytes()).await?;
    writer.write_all(b"\n").await?;

    let mut written = 0;
    let mut buffer = String::with_capacity(WRITE_BATCH_ROWS.min(rows.max(1)) * 64);
    while written < rows {
        buffer.clear();
        let batch = WRITE_BATCH_ROWS.min(rows - written);
        for _ in 0..batch {
            buffer.push_str(&generate_row(&mut rng, start));
            buffer.push('\n');
        }
        writer.write_all(buffer.as_bytes()).await?;
        written += batch;
    }
    writer.flush().await
}
