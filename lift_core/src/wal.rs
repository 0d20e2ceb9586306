//! Write-Ahead Log (WAL) for finished workouts.
//!
//! Workout summaries are appended to a JSONL (JSON Lines) file with file
//! locking to ensure safe concurrent access.

use crate::{Result, WorkoutSummary};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Sink that persists finished workouts
pub trait SummarySink {
    fn append(&mut self, summary: &WorkoutSummary) -> Result<()>;
}

/// JSONL-based summary sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl SummarySink for JsonlSink {
    fn append(&mut self, summary: &WorkoutSummary) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(summary)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Appended workout {} to WAL", summary.id);
        Ok(())
    }
}

/// Read all workouts from a WAL file
pub fn read_summaries(path: &Path) -> Result<Vec<WorkoutSummary>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut summaries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<WorkoutSummary>(&line) {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                tracing::warn!("Failed to parse workout at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} workouts from WAL", summaries.len());
    Ok(summaries)
}
