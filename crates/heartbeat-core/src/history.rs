//! Append-only staleness history, one JSON object per line.
//!
//! Records are partitioned into one file per calendar month
//! (`history/2026-10.jsonl`) so windowed reads only open recent files.

use crate::error::StoreError;
use crate::store::wallet_dir;
use crate::types::StalenessRecord;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

const HISTORY_DIR: &str = "history";
const PARTITION_EXT: &str = "jsonl";

#[derive(Clone, Debug)]
pub struct HistoryLog {
    dir: PathBuf,
}

impl HistoryLog {
    pub fn new(data_dir: &Path, wallet: &str) -> Self {
        Self {
            dir: wallet_dir(data_dir, wallet).join(HISTORY_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the records of `timestamp`'s month.
    pub fn partition_path(&self, timestamp: DateTime<Utc>) -> PathBuf {
        self.dir.join(format!("{}.{}", timestamp.format("%Y-%m"), PARTITION_EXT))
    }

    /// Append records; existing lines are never rewritten.
    pub async fn append(&self, records: &[StalenessRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir).await?;

        let mut batches: BTreeMap<PathBuf, String> = BTreeMap::new();
        for record in records {
            let buf = batches.entry(self.partition_path(record.timestamp)).or_default();
            buf.push_str(&serde_json::to_string(record)?);
            buf.push('\n');
        }

        for (path, buf) in &batches {
            let mut file = OpenOptions::new()
                .create(true)
                .read(true)
                .append(true)
                .open(path)
                .await?;
            if ends_mid_line(&mut file).await? {
                warn!("Terminating partial last line in {}", path.display());
                file.write_all(b"\n").await?;
            }
            file.write_all(buf.as_bytes()).await?;
            file.sync_all().await?;
        }

        debug!(
            records = records.len(),
            partitions = batches.len(),
            "Appended staleness records to {}",
            self.dir.display()
        );
        Ok(())
    }

    /// Read every record, oldest partition first, skipping lines that do not
    /// parse.
    pub async fn load(&self) -> Result<Vec<StalenessRecord>, StoreError> {
        let mut records = Vec::new();
        for path in self.partitions().await? {
            records.extend(read_partition(&path).await?);
        }
        Ok(records)
    }

    /// Records no more than `days_back` days older than the newest record.
    ///
    /// Partitions are read newest first and reading stops at the first
    /// partition that reaches past the window.
    pub async fn load_window(&self, days_back: i64) -> Result<Vec<StalenessRecord>, StoreError> {
        let mut newest: Option<DateTime<Utc>> = None;
        let mut chunks = Vec::new();

        for path in self.partitions().await?.into_iter().rev() {
            let records = read_partition(&path).await?;
            let Some(oldest) = records.iter().map(|r| r.timestamp).min() else {
                continue;
            };
            let latest = records.iter().map(|r| r.timestamp).max().unwrap_or(oldest);
            let window_end = *newest.get_or_insert(latest);
            chunks.push(records);
            if oldest < window_end - Duration::days(days_back) {
                break;
            }
        }

        let Some(newest) = newest else {
            return Ok(Vec::new());
        };
        let cutoff = newest - Duration::days(days_back);
        Ok(chunks
            .into_iter()
            .rev()
            .flatten()
            .filter(|r| r.timestamp >= cutoff)
            .collect())
    }

    /// Partition files in chronological order.
    async fn partitions(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == PARTITION_EXT) {
                paths.push(path);
            }
        }
        // YYYY-MM names sort chronologically.
        paths.sort();
        Ok(paths)
    }
}

/// True when a crash left the file without a trailing newline.
async fn ends_mid_line(file: &mut File) -> Result<bool, std::io::Error> {
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}

async fn read_partition(path: &Path) -> Result<Vec<StalenessRecord>, StoreError> {
    let content = fs::read_to_string(path).await?;

    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<StalenessRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(
                file = %path.display(),
                line = idx + 1,
                %e,
                "Skipping malformed history line"
            ),
        }
    }
    Ok(records)
}
