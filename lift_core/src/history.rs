//! Workout history lookup.
//!
//! Loads the last completed set per exercise from both the WAL and the CSV
//! archive, to seed weight suggestions for a new session.

use crate::csv_rollup::CsvRow;
use crate::{Error, Result, SetRecord, VariationTag};
use chrono::{DateTime, Duration, Utc};
use csv::ReaderBuilder;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A past set together with the exercise and workout it belongs to
#[derive(Clone, Debug)]
pub struct HistoricalSet {
    pub workout_id: String,
    pub exercise_id: String,
    pub set: SetRecord,
}

impl TryFrom<CsvRow> for HistoricalSet {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let recorded_at = DateTime::parse_from_rfc3339(&row.performed_at)
            .map_err(|e| Error::Other(format!("Invalid date: {}", e)))?
            .with_timezone(&Utc);
        let variation: VariationTag = serde_json::from_str(&row.variation)?;

        Ok(HistoricalSet {
            workout_id: row.workout_id,
            exercise_id: row.exercise_id,
            set: SetRecord {
                set_number: row.set_number,
                weight: row.weight,
                reps: row.reps,
                rpe: row.rpe,
                notes: row.notes,
                completed: true,
                variation,
                recorded_at,
            },
        })
    }
}

/// Load sets from the last N days from both WAL and CSV
///
/// Returns sets sorted by recorded time (oldest first). Workouts present in
/// both the WAL and the CSV are only counted once.
pub fn load_recent_sets(wal_path: &Path, csv_path: &Path, days: i64) -> Result<Vec<HistoricalSet>> {
    let cutoff = Utc::now() - Duration::days(days);
    let mut sets = Vec::new();
    let mut seen_workouts = HashSet::new();

    if wal_path.exists() {
        for summary in crate::wal::read_summaries(wal_path)? {
            if summary.completed_at < cutoff {
                continue;
            }
            let workout_id = summary.id.to_string();
            seen_workouts.insert(workout_id.clone());
            for (exercise_id, set) in summary.sets() {
                sets.push(HistoricalSet {
                    workout_id: workout_id.clone(),
                    exercise_id: exercise_id.to_string(),
                    set: set.clone(),
                });
            }
        }
        tracing::debug!("Loaded {} sets from WAL", sets.len());
    }

    if csv_path.exists() {
        let mut csv_count = 0;
        for historical in load_sets_from_csv(csv_path)? {
            if historical.set.recorded_at >= cutoff
                && !seen_workouts.contains(&historical.workout_id)
            {
                sets.push(historical);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} sets from CSV", csv_count);
    }

    sets.sort_by(|a, b| a.set.recorded_at.cmp(&b.set.recorded_at));

    tracing::info!("Loaded {} sets from last {} days", sets.len(), days);
    Ok(sets)
}

/// Last completed set per exercise from the last N days
pub fn load_last_sets(wal_path: &Path, csv_path: &Path, days: i64) -> Result<HashMap<String, SetRecord>> {
    Ok(last_set_per_exercise(load_recent_sets(wal_path, csv_path, days)?))
}

/// Reduce a chronological list of sets to the latest one per exercise
pub fn last_set_per_exercise(sets: Vec<HistoricalSet>) -> HashMap<String, SetRecord> {
    let mut last = HashMap::new();
    for historical in sets {
        if historical.set.completed {
            last.insert(historical.exercise_id, historical.set);
        }
    }
    last
}

fn load_sets_from_csv(path: &Path) -> Result<Vec<HistoricalSet>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut sets = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match HistoricalSet::try_from(row) {
                Ok(historical) => sets.push(historical),
                Err(e) => {
                    tracing::warn!("Failed to parse CSV row: {}", e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to deserialize CSV row: {}", e);
            }
        }
    }

    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::test_support::workout;
    use crate::wal::{JsonlSink, SummarySink};

    #[test]
    fn test_last_set_from_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let csv_path = temp_dir.path().join("sets.csv");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&workout("squat", Utc::now() - Duration::days(3), &[(100.0, 5, 8.0)]))
            .unwrap();
        sink.append(&workout(
            "squat",
            Utc::now() - Duration::days(1),
            &[(105.0, 5, 8.0), (105.0, 4, 9.5)],
        ))
        .unwrap();

        let last = load_last_sets(&wal_path, &csv_path, 7).unwrap();
        let squat = &last["squat"];
        assert_eq!(squat.weight, 105.0);
        assert_eq!(squat.rpe, 9.5);
    }

    #[test]
    fn test_old_workouts_ignored() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let csv_path = temp_dir.path().join("sets.csv");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&workout("deadlift", Utc::now() - Duration::days(40), &[(140.0, 3, 8.0)]))
            .unwrap();

        let last = load_last_sets(&wal_path, &csv_path, 30).unwrap();
        assert!(last.is_empty());
    }

    #[test]
    fn test_csv_and_wal_deduplicated() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let csv_path = temp_dir.path().join("sets.csv");

        let summary = workout("bench_press", Utc::now() - Duration::days(2), &[(80.0, 8, 7.0)]);
        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&summary).unwrap();
        crate::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        // Same workout in both the live WAL and the archive
        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&summary).unwrap();

        let sets = load_recent_sets(&wal_path, &csv_path, 7).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].set.weight, 80.0);
    }

    #[test]
    fn test_csv_only_history() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let csv_path = temp_dir.path().join("sets.csv");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&workout("row", Utc::now() - Duration::days(1), &[(60.0, 10, 6.0)]))
            .unwrap();
        crate::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        let last = load_last_sets(&wal_path, &csv_path, 7).unwrap();
        assert_eq!(last["row"].weight, 60.0);
        assert_eq!(last["row"].variation, VariationTag::Normal);
    }
}
