//! Workout summary aggregation.

use crate::{Exercise, ExerciseSummary, SetRecord, WorkoutSummary};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Sets performed for one exercise during a session
#[derive(Clone, Debug, Default)]
pub(crate) struct ExerciseLog {
    pub sets: Vec<SetRecord>,
    pub skipped: bool,
}

/// Build the summary for a finished session
///
/// `logs` is indexed like `exercises`; exercises never reached count as skipped.
/// Sets of a skipped exercise move to `discarded_sets` and stay out of the totals.
pub(crate) fn build_summary(
    exercises: &[Exercise],
    logs: &[ExerciseLog],
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
) -> WorkoutSummary {
    let per_exercise: Vec<ExerciseSummary> = exercises
        .iter()
        .enumerate()
        .map(|(idx, exercise)| {
            let (sets, discarded_sets, skipped) = match logs.get(idx) {
                Some(log) if log.skipped => (Vec::new(), log.sets.clone(), true),
                Some(log) => (log.sets.clone(), Vec::new(), false),
                None => (Vec::new(), Vec::new(), true),
            };
            ExerciseSummary {
                exercise_id: exercise.id.clone(),
                name: exercise.name.clone(),
                volume: sets.iter().map(SetRecord::volume).sum(),
                sets,
                skipped,
                discarded_sets,
            }
        })
        .collect();

    let total_volume = per_exercise.iter().map(|e| e.volume).sum();
    let total_sets = per_exercise.iter().map(|e| e.sets.len() as u32).sum();
    let duration_seconds = (completed_at - started_at).num_seconds().max(0);

    WorkoutSummary {
        id: Uuid::new_v4(),
        started_at,
        completed_at,
        duration_seconds,
        total_volume,
        total_sets,
        exercises: per_exercise,
    }
}

impl WorkoutSummary {
    /// Every set in the workout paired with its exercise id, in order
    pub fn sets(&self) -> impl Iterator<Item = (&str, &SetRecord)> {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter().map(move |s| (e.exercise_id.as_str(), s)))
    }

    /// Last set recorded for an exercise in this workout
    pub fn last_set_for(&self, exercise_id: &str) -> Option<&SetRecord> {
        self.exercises
            .iter()
            .filter(|e| e.exercise_id == exercise_id)
            .flat_map(|e| e.sets.last())
            .last()
    }

    /// Number of exercises that were skipped or never reached
    pub fn skipped_count(&self) -> usize {
        self.exercises.iter().filter(|e| e.skipped).count()
    }
}
