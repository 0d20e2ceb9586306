//! CSV rollup functionality for archiving WAL workouts.
//!
//! Each set of each workout becomes one CSV row. The WAL is only archived
//! after the CSV has been synced to disk.

use crate::{Result, SetRecord, WorkoutSummary};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV archive (one per set)
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CsvRow {
    pub workout_id: String,
    pub exercise_id: String,
    pub performed_at: String,
    pub set_number: u32,
    pub weight: f64,
    pub reps: u32,
    pub rpe: f64,
    pub volume: f64,
    pub variation: String,
    pub notes: String,
}

impl CsvRow {
    fn new(summary: &WorkoutSummary, exercise_id: &str, set: &SetRecord) -> Result<Self> {
        Ok(CsvRow {
            workout_id: summary.id.to_string(),
            exercise_id: exercise_id.to_string(),
            performed_at: set.recorded_at.to_rfc3339(),
            set_number: set.set_number,
            weight: set.weight,
            reps: set.reps,
            rpe: set.rpe,
            volume: set.volume(),
            variation: serde_json::to_string(&set.variation)?,
            notes: set.notes.clone(),
        })
    }
}

/// Roll up WAL workouts into CSV and archive the WAL atomically
///
/// This function:
/// 1. Reads all workouts from the WAL
/// 2. Appends one row per set to the CSV file (creates with headers if needed)
/// 3. Syncs the CSV to disk
/// 4. Renames the WAL to .processed
/// 5. Returns the number of workouts processed
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let summaries = crate::wal::read_summaries(wal_path)?;

    if summaries.is_empty() {
        tracing::info!("No workouts in WAL to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Only a brand-new file gets a header row
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    let mut rows = 0;
    for summary in &summaries {
        for (exercise_id, set) in summary.sets() {
            writer.serialize(CsvRow::new(summary, exercise_id, set)?)?;
            rows += 1;
        }
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} sets from {} workouts to CSV", rows, summaries.len());

    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(summaries.len())
}

/// Clean up old processed WAL files
///
/// This removes all .wal.processed files in the given directory.
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}
