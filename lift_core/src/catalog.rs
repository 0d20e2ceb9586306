//! Default catalog of exercises and workout templates.
//!
//! This module provides the built-in exercises and the templates a session
//! can be started from, plus loading of custom TOML plans.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog_internal);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog with built-in exercises and templates
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference. This function is retained for testing and custom catalog creation.
pub fn build_default_catalog() -> Catalog {
    build_default_catalog_internal()
}

fn exercise(
    id: &str,
    name: &str,
    category: ExerciseCategory,
    reps: (u32, u32),
    sets: u32,
) -> Exercise {
    Exercise {
        id: id.into(),
        name: name.into(),
        category,
        target_reps: RepRange::new(reps.0, reps.1),
        target_sets: sets,
        rest_seconds: None,
    }
}

fn template(id: &str, name: &str, exercise_ids: &[&str]) -> WorkoutTemplate {
    WorkoutTemplate {
        id: id.into(),
        name: name.into(),
        exercise_ids: exercise_ids.iter().map(|s| s.to_string()).collect(),
    }
}

/// Internal function that actually builds the catalog
fn build_default_catalog_internal() -> Catalog {
    use ExerciseCategory::*;

    // ========================================================================
    // Exercises
    // ========================================================================

    let exercises: HashMap<String, Exercise> = [
        exercise("back_squat", "Back Squat", CompoundBarbell, (5, 8), 4),
        exercise("bench_press", "Bench Press", CompoundBarbell, (6, 8), 4),
        exercise("deadlift", "Deadlift", CompoundBarbell, (3, 5), 3),
        exercise("overhead_press", "Overhead Press", CompoundBarbell, (6, 8), 3),
        exercise("barbell_row", "Barbell Row", CompoundBarbell, (8, 10), 3),
        exercise("leg_press", "Leg Press", CompoundMachine, (10, 12), 3),
        exercise("lat_pulldown", "Lat Pulldown", CompoundMachine, (10, 12), 3),
        exercise("pull_up", "Pull-up", Bodyweight, (5, 10), 3),
        exercise("dip", "Dip", Bodyweight, (8, 12), 3),
        exercise("lateral_raise", "Lateral Raise", Isolation, (12, 15), 3),
        exercise("bicep_curl", "Biceps Curl", Isolation, (10, 12), 3),
        exercise("tricep_pushdown", "Triceps Pushdown", Isolation, (10, 12), 3),
        exercise("leg_curl", "Leg Curl", Isolation, (10, 12), 3),
        exercise("calf_raise", "Calf Raise", Accessory, (12, 15), 3),
        exercise("face_pull", "Face Pull", Accessory, (15, 20), 2),
        exercise("kb_swing", "Kettlebell Swing", Conditioning, (15, 20), 3),
    ]
    .into_iter()
    .map(|e| (e.id.clone(), e))
    .collect();

    // ========================================================================
    // Workout Templates
    // ========================================================================

    let templates: HashMap<String, WorkoutTemplate> = [
        template(
            "push",
            "Push Day",
            &["bench_press", "overhead_press", "dip", "lateral_raise", "tricep_pushdown"],
        ),
        template(
            "pull",
            "Pull Day",
            &["deadlift", "barbell_row", "pull_up", "face_pull", "bicep_curl"],
        ),
        template(
            "legs",
            "Leg Day",
            &["back_squat", "leg_press", "leg_curl", "calf_raise"],
        ),
        template(
            "full",
            "Full Body",
            &["back_squat", "bench_press", "lat_pulldown", "kb_swing"],
        ),
    ]
    .into_iter()
    .map(|t| (t.id.clone(), t))
    .collect();

    Catalog {
        exercises,
        templates,
    }
}

impl Catalog {
    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (id, exercise) in &self.exercises {
            if id.is_empty() || exercise.id.is_empty() {
                errors.push("Exercise has empty ID".to_string());
            }
            if id != &exercise.id {
                errors.push(format!(
                    "Exercise key '{}' doesn't match exercise.id '{}'",
                    id, exercise.id
                ));
            }
            if exercise.name.is_empty() {
                errors.push(format!("Exercise '{}' has empty name", id));
            }
            errors.extend(validate_exercise(exercise));
        }

        for (id, template) in &self.templates {
            if id != &template.id {
                errors.push(format!(
                    "Template key '{}' doesn't match template.id '{}'",
                    id, template.id
                ));
            }
            if template.exercise_ids.is_empty() {
                errors.push(format!("Template '{}' has no exercises", id));
            }

            // Check that all referenced exercises exist
            for exercise_id in &template.exercise_ids {
                if !self.exercises.contains_key(exercise_id) {
                    errors.push(format!(
                        "Template '{}' references non-existent exercise '{}'",
                        id, exercise_id
                    ));
                }
            }
        }

        errors
    }

    /// Resolve a template into the ordered exercise list for a session
    pub fn template_exercises(&self, template_id: &str) -> Result<Vec<Exercise>> {
        let template = self.templates.get(template_id).ok_or_else(|| {
            Error::Catalog(format!("Unknown workout template '{}'", template_id))
        })?;

        template
            .exercise_ids
            .iter()
            .map(|id| {
                self.exercises.get(id).cloned().ok_or_else(|| {
                    Error::Catalog(format!(
                        "Template '{}' references non-existent exercise '{}'",
                        template_id, id
                    ))
                })
            })
            .collect()
    }

    /// Template ids in a stable order
    pub fn template_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

fn validate_exercise(exercise: &Exercise) -> Vec<String> {
    let mut errors = Vec::new();
    if exercise.target_sets == 0 {
        errors.push(format!("Exercise '{}' targets zero sets", exercise.id));
    }
    if exercise.target_reps.min > exercise.target_reps.max {
        errors.push(format!(
            "Exercise '{}': min reps {} > max {}",
            exercise.id, exercise.target_reps.min, exercise.target_reps.max
        ));
    }
    if exercise.target_reps.max == 0 {
        errors.push(format!("Exercise '{}' targets zero reps", exercise.id));
    }
    errors
}

// ============================================================================
// Custom Plans
// ============================================================================

/// A user-authored workout plan loaded from TOML
///
/// ```toml
/// name = "Upper A"
///
/// [[exercises]]
/// id = "bench_press"
///
/// [[exercises]]
/// id = "cable_fly"
/// name = "Cable Fly"
/// category = "isolation"
/// target_reps = { min = 12, max = 15 }
/// target_sets = 3
/// rest_seconds = 45
/// ```
///
/// Entries that only carry an `id` are looked up in the catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub exercises: Vec<PlanEntry>,
}

/// One exercise in a plan; missing fields come from the catalog
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanEntry {
    pub id: String,
    pub name: Option<String>,
    pub category: Option<ExerciseCategory>,
    pub target_reps: Option<RepRange>,
    pub target_sets: Option<u32>,
    pub rest_seconds: Option<u32>,
}

impl Plan {
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let plan: Plan = toml::from_str(&contents)?;
        tracing::info!("Loaded plan '{}' from {:?}", plan.name, path);
        Ok(plan)
    }

    /// Resolve every entry against `catalog` into a session exercise list
    pub fn resolve(&self, catalog: &Catalog) -> Result<Vec<Exercise>> {
        if self.exercises.is_empty() {
            return Err(Error::Catalog(format!("Plan '{}' has no exercises", self.name)));
        }

        let mut resolved = Vec::with_capacity(self.exercises.len());
        for entry in &self.exercises {
            let exercise = match catalog.exercises.get(&entry.id) {
                Some(base) => Exercise {
                    id: base.id.clone(),
                    name: entry.name.clone().unwrap_or_else(|| base.name.clone()),
                    category: entry.category.unwrap_or(base.category),
                    target_reps: entry.target_reps.unwrap_or(base.target_reps),
                    target_sets: entry.target_sets.unwrap_or(base.target_sets),
                    rest_seconds: entry.rest_seconds.or(base.rest_seconds),
                },
                None => match (&entry.name, entry.category, entry.target_reps, entry.target_sets) {
                    (Some(name), Some(category), Some(target_reps), Some(target_sets)) => Exercise {
                        id: entry.id.clone(),
                        name: name.clone(),
                        category,
                        target_reps,
                        target_sets,
                        rest_seconds: entry.rest_seconds,
                    },
                    _ => {
                        return Err(Error::Catalog(format!(
                            "Plan exercise '{}' is not in the catalog and is missing \
                             name, category, target_reps or target_sets",
                            entry.id
                        )));
                    }
                },
            };

            let errors = validate_exercise(&exercise);
            if !errors.is_empty() {
                return Err(Error::Catalog(errors.join("; ")));
            }
            resolved.push(exercise);
        }

        Ok(resolved)
    }
}
