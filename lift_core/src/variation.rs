//! Advanced training techniques for the exercise in progress.
//!
//! The manager holds the exercise-scoped technique toggles and builds the
//! technique-tagged [`SetRecord`]s. It never merges techniques on its own: the
//! tag of a record is whichever technique the call site invoked.

use crate::{
    DropEntry, Error, ExerciseVariationsConfig, Result, SetInput, SetRecord, VariationKey,
    VariationTag,
};
use chrono::{DateTime, Utc};

/// Maximum number of drops a drop set may carry
pub const MAX_DROPS: usize = 4;

/// Default weight removed between drops when none is entered (absolute units)
pub const DEFAULT_DROP_DECREMENT: f64 = 10.0;

/// A drop as authored in the drop-set editor
///
/// A missing weight is filled with the suggested drop from the previous one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropInput {
    pub weight: Option<f64>,
    pub reps: u32,
}

impl DropInput {
    pub fn new(weight: f64, reps: u32) -> Self {
        Self {
            weight: Some(weight),
            reps,
        }
    }

    pub fn suggested(reps: u32) -> Self {
        Self { weight: None, reps }
    }
}

/// A technique invocation for a single logical set
#[derive(Clone, Debug, PartialEq)]
pub enum Technique {
    Drop(Vec<DropInput>),
    /// Extra reps per mini-set after the main effort
    RestPause {
        mini_sets: Vec<u32>,
        pause_seconds: u32,
    },
    /// Reps per block; replaces the input's rep count
    Cluster {
        blocks: Vec<u32>,
        intra_rest_seconds: u32,
    },
    MechanicalDrop,
    Tempo(String),
}

impl Technique {
    pub fn toggle(&self) -> VariationKey {
        match self {
            Technique::Drop(_) => VariationKey::DropSets,
            Technique::RestPause { .. } => VariationKey::RestPause,
            Technique::Cluster { .. } => VariationKey::Clusters,
            Technique::MechanicalDrop => VariationKey::MechanicalDrops,
            Technique::Tempo(_) => VariationKey::TempoWork,
        }
    }
}

/// Holds technique toggles and materializes technique sets
#[derive(Clone, Debug)]
pub struct VariationManager {
    config: ExerciseVariationsConfig,
    drop_decrement: f64,
}

impl Default for VariationManager {
    fn default() -> Self {
        Self::new(DEFAULT_DROP_DECREMENT)
    }
}

impl VariationManager {
    pub fn new(drop_decrement: f64) -> Self {
        Self {
            config: ExerciseVariationsConfig::default(),
            drop_decrement: drop_decrement.max(0.0),
        }
    }

    /// Change the drop step without touching the toggles
    pub fn set_drop_decrement(&mut self, drop_decrement: f64) {
        self.drop_decrement = drop_decrement.max(0.0);
    }

    pub fn config(&self) -> &ExerciseVariationsConfig {
        &self.config
    }

    pub fn is_enabled(&self, key: VariationKey) -> bool {
        self.config.get(key)
    }

    /// Flip a toggle. Toggles are independent and may combine.
    pub fn toggle(&mut self, key: VariationKey, enabled: bool) {
        self.config.set(key, enabled);
        tracing::debug!("Variation {:?} -> {}", key, enabled);
    }

    /// Reset toggles for a new exercise; auto-progression carries over
    pub fn reset_for_next_exercise(&mut self) {
        let auto_progression = self.config.auto_progression;
        self.config = ExerciseVariationsConfig {
            auto_progression,
            ..Default::default()
        };
    }

    /// Suggested weight for the drop after one at `previous_weight`
    pub fn suggest_drop_weight(&self, previous_weight: f64) -> f64 {
        (previous_weight - self.drop_decrement).max(0.0)
    }

    /// Build a single record for `technique`
    pub fn build(
        &self,
        set_number: u32,
        input: SetInput,
        technique: Technique,
        recorded_at: DateTime<Utc>,
    ) -> Result<SetRecord> {
        match technique {
            Technique::Drop(drops) => self.expand_drop_set(set_number, input, &drops, recorded_at),
            Technique::RestPause {
                mini_sets,
                pause_seconds,
            } => expand_rest_pause(set_number, input, &mini_sets, pause_seconds, recorded_at),
            Technique::Cluster {
                blocks,
                intra_rest_seconds,
            } => expand_cluster(set_number, input, &blocks, intra_rest_seconds, recorded_at),
            Technique::MechanicalDrop => mark_mechanical_drop(set_number, input, recorded_at),
            Technique::Tempo(pattern) => mark_tempo(set_number, input, &pattern, recorded_at),
        }
    }

    /// Confirm a drop set: one logical set carrying every valid drop
    ///
    /// Between 1 and [`MAX_DROPS`] drops must be authored. Drops with zero
    /// weight or zero reps are left out; if none remain the confirm fails.
    pub fn expand_drop_set(
        &self,
        set_number: u32,
        main: SetInput,
        drops: &[DropInput],
        recorded_at: DateTime<Utc>,
    ) -> Result<SetRecord> {
        main.validate()?;

        if drops.is_empty() || drops.len() > MAX_DROPS {
            return Err(Error::DropSetConfiguration(format!(
                "a drop set needs between 1 and {} drops, got {}",
                MAX_DROPS,
                drops.len()
            )));
        }

        let mut previous = main.weight;
        let mut confirmed = Vec::with_capacity(drops.len());
        for drop in drops {
            let weight = match drop.weight {
                Some(w) if !w.is_finite() || w < 0.0 => {
                    return Err(Error::Validation(format!(
                        "drop weight must be a non-negative number, got {}",
                        w
                    )));
                }
                Some(w) => w,
                None => self.suggest_drop_weight(previous),
            };
            previous = weight;

            if weight == 0.0 || drop.reps == 0 {
                tracing::debug!("Excluding empty drop {}x{}", weight, drop.reps);
                continue;
            }
            confirmed.push(DropEntry {
                weight,
                reps: drop.reps,
            });
        }

        if confirmed.is_empty() {
            return Err(Error::DropSetConfiguration(
                "every drop is empty (zero weight or zero reps)".into(),
            ));
        }

        main.into_record(set_number, VariationTag::Drop { drops: confirmed }, recorded_at)
    }
}

/// Rest-pause: the main effort plus mini-sets at the same weight
///
/// The record's reps are the total across blocks.
pub fn expand_rest_pause(
    set_number: u32,
    mut main: SetInput,
    mini_sets: &[u32],
    pause_seconds: u32,
    recorded_at: DateTime<Utc>,
) -> Result<SetRecord> {
    main.validate()?;
    if mini_sets.is_empty() || mini_sets.iter().any(|&r| r == 0) {
        return Err(Error::Validation(
            "rest-pause needs at least one mini-set with reps".into(),
        ));
    }

    let mut blocks = Vec::with_capacity(mini_sets.len() + 1);
    blocks.push(main.reps as u32);
    blocks.extend_from_slice(mini_sets);
    main.reps = total_reps(&blocks)?;

    main.into_record(
        set_number,
        VariationTag::RestPause {
            blocks,
            pause_seconds,
        },
        recorded_at,
    )
}

/// Cluster set: reps split into blocks; the input's rep count is replaced
pub fn expand_cluster(
    set_number: u32,
    mut main: SetInput,
    blocks: &[u32],
    intra_rest_seconds: u32,
    recorded_at: DateTime<Utc>,
) -> Result<SetRecord> {
    if blocks.len() < 2 || blocks.iter().any(|&r| r == 0) {
        return Err(Error::Validation(
            "a cluster needs at least two non-empty blocks".into(),
        ));
    }
    main.reps = total_reps(blocks)?;

    main.into_record(
        set_number,
        VariationTag::Cluster {
            blocks: blocks.to_vec(),
            intra_rest_seconds,
        },
        recorded_at,
    )
}

/// Mechanical drop: same load, easier variation of the movement
pub fn mark_mechanical_drop(
    set_number: u32,
    main: SetInput,
    recorded_at: DateTime<Utc>,
) -> Result<SetRecord> {
    main.into_record(set_number, VariationTag::MechanicalDrop, recorded_at)
}

/// Tempo work; the pattern is four dash-separated phases (digits or `X`)
pub fn mark_tempo(
    set_number: u32,
    main: SetInput,
    pattern: &str,
    recorded_at: DateTime<Utc>,
) -> Result<SetRecord> {
    let pattern = pattern.trim().to_uppercase();
    if !is_valid_tempo(&pattern) {
        return Err(Error::Validation(format!(
            "tempo pattern must look like 3-1-2-0, got '{}'",
            pattern
        )));
    }

    main.into_record(set_number, VariationTag::Tempo { pattern }, recorded_at)
}

fn is_valid_tempo(pattern: &str) -> bool {
    let phases: Vec<&str> = pattern.split('-').collect();
    phases.len() == 4
        && phases
            .iter()
            .all(|p| *p == "X" || (!p.is_empty() && p.chars().all(|c| c.is_ascii_digit())))
}

fn total_reps(blocks: &[u32]) -> Result<i32> {
    let total: u64 = blocks.iter().map(|&r| r as u64).sum();
    i32::try_from(total).map_err(|_| Error::Validation(format!("too many reps: {}", total)))
}
