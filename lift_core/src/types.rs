//! Core domain types for the lift session engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises and their categories
//! - Set input and immutable set records
//! - Training technique variations
//! - Load progression policies
//! - Workout summaries and the built-in catalog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result};

// ============================================================================
// Exercise Types
// ============================================================================

/// Category of exercise, used to pick a default rest duration
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    CompoundBarbell,
    CompoundMachine,
    Bodyweight,
    Isolation,
    Accessory,
    Conditioning,
}

impl ExerciseCategory {
    pub const ALL: [ExerciseCategory; 6] = [
        ExerciseCategory::CompoundBarbell,
        ExerciseCategory::CompoundMachine,
        ExerciseCategory::Bodyweight,
        ExerciseCategory::Isolation,
        ExerciseCategory::Accessory,
        ExerciseCategory::Conditioning,
    ];
}

/// Target repetition range for an exercise (inclusive)
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepRange {
    pub min: u32,
    pub max: u32,
}

impl RepRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

impl fmt::Display for RepRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

/// An exercise in a workout (read-only input to a session)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub category: ExerciseCategory,
    pub target_reps: RepRange,
    pub target_sets: u32,
    /// Explicit rest override; falls back to the category default when absent
    #[serde(default)]
    pub rest_seconds: Option<u32>,
}

// ============================================================================
// Set Types
// ============================================================================

/// Raw per-set input as entered by the user
///
/// Numbers are deliberately loose here; [`SetInput::validate`] is the boundary
/// where malformed input is rejected.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetInput {
    pub weight: f64,
    pub reps: i32,
    pub rpe: f64,
    #[serde(default)]
    pub notes: String,
}

impl SetInput {
    pub fn new(weight: f64, reps: i32, rpe: f64) -> Self {
        Self {
            weight,
            reps,
            rpe,
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Reject negative or non-finite weight, negative reps and RPE outside 1-10
    pub fn validate(&self) -> Result<()> {
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(Error::Validation(format!(
                "weight must be a non-negative number, got {}",
                self.weight
            )));
        }
        if self.reps < 0 {
            return Err(Error::Validation(format!(
                "reps must be non-negative, got {}",
                self.reps
            )));
        }
        if !self.rpe.is_finite() || !(1.0..=10.0).contains(&self.rpe) {
            return Err(Error::Validation(format!(
                "rpe must be between 1 and 10, got {}",
                self.rpe
            )));
        }
        Ok(())
    }

    /// Validate and turn this input into an immutable record
    pub fn into_record(
        self,
        set_number: u32,
        variation: VariationTag,
        recorded_at: DateTime<Utc>,
    ) -> Result<SetRecord> {
        self.validate()?;
        Ok(SetRecord {
            set_number: set_number.max(1),
            weight: self.weight,
            reps: self.reps as u32,
            rpe: self.rpe,
            notes: self.notes,
            completed: true,
            variation,
            recorded_at,
        })
    }
}

/// One sub-set of a drop set
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct DropEntry {
    pub weight: f64,
    pub reps: u32,
}

impl DropEntry {
    pub fn volume(&self) -> f64 {
        self.weight * self.reps as f64
    }
}

/// Training technique applied to a set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariationTag {
    #[default]
    Normal,
    /// Main set followed by reduced-weight drops without rest
    Drop { drops: Vec<DropEntry> },
    /// Reps per block at the same weight, separated by short pauses
    RestPause { blocks: Vec<u32>, pause_seconds: u32 },
    /// Set split into blocks with brief intra-set rests
    Cluster {
        blocks: Vec<u32>,
        intra_rest_seconds: u32,
    },
    MechanicalDrop,
    Tempo { pattern: String },
}

impl VariationTag {
    /// Short label for display and CSV output
    pub fn label(&self) -> &'static str {
        match self {
            VariationTag::Normal => "normal",
            VariationTag::Drop { .. } => "drop",
            VariationTag::RestPause { .. } => "rest_pause",
            VariationTag::Cluster { .. } => "cluster",
            VariationTag::MechanicalDrop => "mechanical_drop",
            VariationTag::Tempo { .. } => "tempo",
        }
    }
}

/// A completed set attempt
///
/// Records are appended to a session log and never mutated afterward.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetRecord {
    pub set_number: u32,
    pub weight: f64,
    pub reps: u32,
    pub rpe: f64,
    pub notes: String,
    pub completed: bool,
    pub variation: VariationTag,
    pub recorded_at: DateTime<Utc>,
}

impl SetRecord {
    /// Volume of the set: weight x reps, plus every drop of a drop set
    pub fn volume(&self) -> f64 {
        let main = self.weight * self.reps as f64;
        match &self.variation {
            VariationTag::Drop { drops } => main + drops.iter().map(DropEntry::volume).sum::<f64>(),
            _ => main,
        }
    }
}

// ============================================================================
// Variation Toggles
// ============================================================================

/// Key of a single toggle in [`ExerciseVariationsConfig`]
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VariationKey {
    DropSets,
    RestPause,
    Clusters,
    MechanicalDrops,
    TempoWork,
    AutoProgression,
}

impl FromStr for VariationKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "drop" | "drops" | "drop_sets" => Ok(VariationKey::DropSets),
            "rest_pause" | "restpause" => Ok(VariationKey::RestPause),
            "cluster" | "clusters" => Ok(VariationKey::Clusters),
            "mechanical" | "mechanical_drops" => Ok(VariationKey::MechanicalDrops),
            "tempo" | "tempo_work" => Ok(VariationKey::TempoWork),
            "auto" | "auto_progression" => Ok(VariationKey::AutoProgression),
            other => Err(Error::Validation(format!("unknown variation '{}'", other))),
        }
    }
}

/// Technique toggles for the exercise currently in progress
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ExerciseVariationsConfig {
    pub drop_sets: bool,
    pub rest_pause: bool,
    pub clusters: bool,
    pub mechanical_drops: bool,
    pub tempo_work: bool,
    pub auto_progression: bool,
}

impl ExerciseVariationsConfig {
    pub fn get(&self, key: VariationKey) -> bool {
        match key {
            VariationKey::DropSets => self.drop_sets,
            VariationKey::RestPause => self.rest_pause,
            VariationKey::Clusters => self.clusters,
            VariationKey::MechanicalDrops => self.mechanical_drops,
            VariationKey::TempoWork => self.tempo_work,
            VariationKey::AutoProgression => self.auto_progression,
        }
    }

    pub fn set(&mut self, key: VariationKey, enabled: bool) {
        let slot = match key {
            VariationKey::DropSets => &mut self.drop_sets,
            VariationKey::RestPause => &mut self.rest_pause,
            VariationKey::Clusters => &mut self.clusters,
            VariationKey::MechanicalDrops => &mut self.mechanical_drops,
            VariationKey::TempoWork => &mut self.tempo_work,
            VariationKey::AutoProgression => &mut self.auto_progression,
        };
        *slot = enabled;
    }
}

// ============================================================================
// Load Progression Types
// ============================================================================

/// How working weight progresses across sets
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionKind {
    Linear,
    Percentage,
    RpeBased,
    Custom,
}

impl FromStr for ProgressionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "linear" => Ok(ProgressionKind::Linear),
            "percentage" | "percent" => Ok(ProgressionKind::Percentage),
            "rpe" | "rpe_based" => Ok(ProgressionKind::RpeBased),
            "custom" => Ok(ProgressionKind::Custom),
            other => Err(Error::Validation(format!(
                "unknown progression kind '{}'",
                other
            ))),
        }
    }
}

/// A load progression policy
///
/// `increment` is an absolute weight delta under `Linear`, a percentage of the
/// current weight under `Percentage`, and ignored otherwise.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct LoadProgression {
    pub kind: ProgressionKind,
    pub increment: f64,
    #[serde(default)]
    pub target_rpe: Option<f64>,
}

impl Default for LoadProgression {
    fn default() -> Self {
        Self {
            kind: ProgressionKind::RpeBased,
            increment: 0.0,
            target_rpe: Some(8.0),
        }
    }
}

impl LoadProgression {
    pub fn linear(increment: f64) -> Self {
        Self {
            kind: ProgressionKind::Linear,
            increment,
            target_rpe: None,
        }
    }

    pub fn percentage(increment: f64) -> Self {
        Self {
            kind: ProgressionKind::Percentage,
            increment,
            target_rpe: None,
        }
    }

    pub fn rpe_based(target_rpe: f64) -> Self {
        Self {
            kind: ProgressionKind::RpeBased,
            increment: 0.0,
            target_rpe: Some(target_rpe),
        }
    }

    pub fn with_target(mut self, target_rpe: Option<f64>) -> Self {
        self.target_rpe = target_rpe;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.increment.is_finite() {
            return Err(Error::Validation("increment must be finite".into()));
        }
        if let Some(target) = self.target_rpe {
            if !(6.0..=10.0).contains(&target) {
                return Err(Error::Validation(format!(
                    "target rpe must be between 6 and 10, got {}",
                    target
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Summary Types
// ============================================================================

/// Per-exercise slice of a finished workout
///
/// A skipped exercise counts for nothing: `sets` is empty, `volume` is 0 and
/// anything recorded before the skip is kept in `discarded_sets`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSummary {
    pub exercise_id: String,
    pub name: String,
    pub sets: Vec<SetRecord>,
    pub volume: f64,
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discarded_sets: Vec<SetRecord>,
}

/// Aggregate over a finished workout session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSummary {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub total_volume: f64,
    pub total_sets: u32,
    pub exercises: Vec<ExerciseSummary>,
}

// ============================================================================
// Catalog Types
// ============================================================================

/// A named list of exercises that can start a session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutTemplate {
    pub id: String,
    pub name: String,
    pub exercise_ids: Vec<String>,
}

/// The built-in catalog of exercises and workout templates
#[derive(Clone, Debug)]
pub struct Catalog {
    pub exercises: HashMap<String, Exercise>,
    pub templates: HashMap<String, WorkoutTemplate>,
}
