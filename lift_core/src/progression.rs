//! Load progression logic for suggesting working weights.
//!
//! Two independent entry points:
//! - [`calculate_progressive_load`] projects weight across the sets of one
//!   exercise from a policy alone, before any feedback exists
//! - [`suggest_next_weight`] reacts to the RPE of the last completed set

use crate::{LoadProgression, ProgressionKind, SetRecord};
use serde::{Deserialize, Serialize};

/// Default bar increment applied by RPE feedback (kg)
pub const DEFAULT_RPE_STEP: f64 = 2.5;

/// Thresholds used to turn RPE feedback into a load correction
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct RpeRules {
    /// RPE at or below this means the set was too easy
    pub easy_max: f64,
    /// RPE at or above this means the set was near failure
    pub hard_min: f64,
    /// Weight added or removed per correction
    pub step: f64,
}

impl Default for RpeRules {
    fn default() -> Self {
        Self {
            easy_max: 6.0,
            hard_min: 9.0,
            step: DEFAULT_RPE_STEP,
        }
    }
}

/// Project the working weight for `set_number` under `policy`
///
/// - Linear: `base + increment * (set - 1)`
/// - Percentage: `base * (1 + increment/100)^(set - 1)`, compounding set over set
/// - RpeBased / Custom: `base` unchanged
///
/// Never returns a negative weight. Set number 0 is treated as the first set.
pub fn calculate_progressive_load(set_number: u32, base_weight: f64, policy: &LoadProgression) -> f64 {
    let steps = set_number.saturating_sub(1);
    let projected = match policy.kind {
        ProgressionKind::Linear => base_weight + policy.increment * steps as f64,
        ProgressionKind::Percentage => {
            let exponent = i32::try_from(steps).unwrap_or(i32::MAX);
            base_weight * (1.0 + policy.increment / 100.0).powi(exponent)
        }
        ProgressionKind::RpeBased | ProgressionKind::Custom => base_weight,
    };

    projected.max(0.0)
}

/// Suggest the weight for the next set from the last completed one
///
/// Returns 0 when there is no history yet; the caller falls back to a
/// manually entered value.
pub fn suggest_next_weight(last_set: Option<&SetRecord>, target_reps: u32) -> f64 {
    suggest_next_weight_with(&RpeRules::default(), last_set, target_reps)
}

/// [`suggest_next_weight`] with explicit RPE thresholds
pub fn suggest_next_weight_with(
    rules: &RpeRules,
    last_set: Option<&SetRecord>,
    target_reps: u32,
) -> f64 {
    let Some(last) = last_set else {
        return 0.0;
    };

    let suggested = if last.rpe <= rules.easy_max {
        last.weight + rules.step
    } else if last.rpe >= rules.hard_min {
        last.weight - rules.step
    } else {
        last.weight
    };

    tracing::debug!(
        "Suggesting {} after {}x{} @ RPE {} (target {} reps)",
        suggested.max(0.0),
        last.weight,
        last.reps,
        last.rpe,
        target_reps
    );

    suggested.max(0.0)
}

/// Round a weight to the nearest loadable increment (e.g. 2.5 kg plates)
pub fn round_to_increment(weight: f64, increment: f64) -> f64 {
    if increment <= 0.0 || !increment.is_finite() {
        return weight;
    }
    ((weight / increment).round() * increment).max(0.0)
}
