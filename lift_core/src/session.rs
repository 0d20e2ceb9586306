//! Active workout session state machine.
//!
//! A [`SessionController`] is the single authority over a live workout:
//!
//! ```text
//! NotStarted -> InProgress(exercise i, set j, resting?) -> ... -> Completed
//! ```
//!
//! It owns the exercise/set cursors, the technique toggles, the rest timer and
//! the feedback hooks. Everything runs on the caller's thread; the host drives
//! the rest countdown by calling [`SessionController::tick`] once per second.

use crate::progression::{calculate_progressive_load, suggest_next_weight_with, RpeRules};
use crate::summary::{build_summary, ExerciseLog};
use crate::timer::{RestTable, RestTimer, TickOutcome};
use crate::variation::{Technique, VariationManager};
use crate::{
    Config, Error, Exercise, ExerciseVariationsConfig, LoadProgression, ProgressionKind, Result,
    SetInput, SetRecord, VariationKey, VariationTag, WorkoutSummary,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

// ============================================================================
// Hooks
// ============================================================================

/// Presentation-side cues fired by the engine
///
/// Both are called inline from the transition path and must not block.
pub trait SessionHooks {
    /// A set was just recorded
    fn set_completed(&mut self, record: &SetRecord);

    /// The rest countdown for `exercise` ran out
    fn rest_completed(&mut self, exercise: &Exercise);
}

/// Hooks that do nothing
#[derive(Debug, Default)]
pub struct NoopHooks;

impl SessionHooks for NoopHooks {
    fn set_completed(&mut self, _record: &SetRecord) {}

    fn rest_completed(&mut self, _exercise: &Exercise) {}
}

/// Source of the current time
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send>;

// ============================================================================
// Session Types
// ============================================================================

/// Lifecycle phase of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    NotStarted,
    InProgress,
    Completed,
}

/// Where the pre-filled weight came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefillSource {
    /// No history to suggest from; the user has to enter a weight
    Empty,
    Suggested,
    /// Entered by the user; suggestions never overwrite it
    Manual,
}

/// Weight shown in the input box for the next set
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prefill {
    pub weight: f64,
    pub source: PrefillSource,
}

impl Prefill {
    pub fn empty() -> Self {
        Self {
            weight: 0.0,
            source: PrefillSource::Empty,
        }
    }

    pub fn is_manual(&self) -> bool {
        self.source == PrefillSource::Manual
    }
}

/// What happened after a transition
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    /// Same exercise, next set; rest has started
    NextSet {
        set_number: u32,
        rest_seconds: u32,
        prefill: Prefill,
    },
    /// Cursor moved to another exercise, set 1
    NextExercise {
        exercise_index: usize,
        prefill: Prefill,
    },
    /// Session finished
    Completed(WorkoutSummary),
}

impl Transition {
    pub fn summary(&self) -> Option<&WorkoutSummary> {
        match self {
            Transition::Completed(summary) => Some(summary),
            _ => None,
        }
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Drives a user through an exercise list, one set at a time
pub struct SessionController {
    exercises: Vec<Exercise>,
    logs: Vec<ExerciseLog>,
    phase: SessionPhase,
    current_exercise_index: usize,
    current_set_number: u32,
    extra_sets: u32,
    is_resting: bool,
    session_started_at: Option<DateTime<Utc>>,
    variations: VariationManager,
    timer: RestTimer,
    rest_table: RestTable,
    rpe_rules: RpeRules,
    default_policy: LoadProgression,
    exercise_policies: HashMap<String, LoadProgression>,
    history: HashMap<String, SetRecord>,
    prefill: Prefill,
    hooks: Box<dyn SessionHooks>,
    clock: Clock,
    summary: Option<WorkoutSummary>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase)
            .field("current_exercise_index", &self.current_exercise_index)
            .field("current_set_number", &self.current_set_number)
            .field("is_resting", &self.is_resting)
            .field("prefill", &self.prefill)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Create a session over `exercises`
    ///
    /// The list must be non-empty and every exercise must target at least one set.
    pub fn new(exercises: Vec<Exercise>) -> Result<Self> {
        if exercises.is_empty() {
            return Err(Error::Validation("a session needs at least one exercise".into()));
        }
        for exercise in &exercises {
            if exercise.target_sets == 0 {
                return Err(Error::Validation(format!(
                    "exercise '{}' targets zero sets",
                    exercise.id
                )));
            }
            if exercise.target_reps.min > exercise.target_reps.max {
                return Err(Error::Validation(format!(
                    "exercise '{}' has an empty rep range {}",
                    exercise.id, exercise.target_reps
                )));
            }
        }

        let logs = vec![ExerciseLog::default(); exercises.len()];
        Ok(Self {
            exercises,
            logs,
            phase: SessionPhase::NotStarted,
            current_exercise_index: 0,
            current_set_number: 1,
            extra_sets: 0,
            is_resting: false,
            session_started_at: None,
            variations: VariationManager::default(),
            timer: RestTimer::new(),
            rest_table: RestTable::default(),
            rpe_rules: RpeRules::default(),
            default_policy: LoadProgression::default(),
            exercise_policies: HashMap::new(),
            history: HashMap::new(),
            prefill: Prefill::empty(),
            hooks: Box::new(NoopHooks),
            clock: Box::new(Utc::now),
            summary: None,
        })
    }

    /// Apply rest, RPE and drop-set settings from configuration
    pub fn with_config(mut self, config: &Config) -> Self {
        self.rest_table = config.rest.clone();
        self.rpe_rules = config.progression.rpe_rules();
        self.default_policy = config.progression.default_policy();
        self.variations
            .set_drop_decrement(config.progression.drop_decrement);
        self
    }

    /// Policy used for exercises without their own
    pub fn with_policy(mut self, policy: LoadProgression) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn with_exercise_policy(mut self, exercise_id: impl Into<String>, policy: LoadProgression) -> Self {
        self.exercise_policies.insert(exercise_id.into(), policy);
        self
    }

    /// Last completed set per exercise id from previous workouts
    pub fn with_history(mut self, history: HashMap<String, SetRecord>) -> Self {
        self.history = history;
        self
    }

    pub fn with_hooks<H: SessionHooks + 'static>(mut self, hooks: H) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn with_rest_table(mut self, table: RestTable) -> Self {
        self.rest_table = table;
        self
    }

    pub fn with_rpe_rules(mut self, rules: RpeRules) -> Self {
        self.rpe_rules = rules;
        self
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    /// Initial auto-progression preference (sticky across exercises)
    pub fn with_auto_progression(mut self, enabled: bool) -> Self {
        self.variations.toggle(VariationKey::AutoProgression, enabled);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    /// Index of the active exercise, or the exercise count once completed
    pub fn current_exercise_index(&self) -> usize {
        self.current_exercise_index
    }

    pub fn current_exercise(&self) -> Option<&Exercise> {
        match self.phase {
            SessionPhase::Completed => None,
            _ => self.exercises.get(self.current_exercise_index),
        }
    }

    pub fn current_set_number(&self) -> u32 {
        self.current_set_number
    }

    /// Target sets for the active exercise, including any added sets
    pub fn current_target_sets(&self) -> u32 {
        self.current_exercise()
            .map(|e| e.target_sets + self.extra_sets)
            .unwrap_or(0)
    }

    pub fn is_resting(&self) -> bool {
        self.is_resting
    }

    pub fn completed_sets_this_exercise(&self) -> &[SetRecord] {
        match self.phase {
            SessionPhase::InProgress => &self.logs[self.current_exercise_index].sets,
            _ => &[],
        }
    }

    pub fn session_started_at(&self) -> Option<DateTime<Utc>> {
        self.session_started_at
    }

    pub fn variations(&self) -> &ExerciseVariationsConfig {
        self.variations.config()
    }

    pub fn rest_timer(&self) -> &RestTimer {
        &self.timer
    }

    pub fn prefill(&self) -> Prefill {
        self.prefill
    }

    /// The summary, once the session has completed
    pub fn summary(&self) -> Option<&WorkoutSummary> {
        self.summary.as_ref()
    }

    /// Policy in effect for an exercise
    pub fn policy_for(&self, exercise_id: &str) -> LoadProgression {
        self.exercise_policies
            .get(exercise_id)
            .copied()
            .unwrap_or(self.default_policy)
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Begin the workout; returns the pre-fill for the first set
    pub fn start(&mut self) -> Result<Prefill> {
        if self.phase != SessionPhase::NotStarted {
            return Err(Error::InvalidState(format!(
                "cannot start a session that is {:?}",
                self.phase
            )));
        }

        self.phase = SessionPhase::InProgress;
        self.session_started_at = Some((self.clock)());
        self.refresh_prefill(true);

        tracing::info!(
            "Session started with {} exercises, first: {}",
            self.exercises.len(),
            self.exercises[0].name
        );
        Ok(self.prefill)
    }

    /// Record a plain set for the active exercise
    pub fn record_set(&mut self, input: SetInput) -> Result<Transition> {
        self.ensure_in_progress("record a set")?;
        let now = (self.clock)();
        let record = input.into_record(self.current_set_number, VariationTag::Normal, now)?;
        self.commit(record)
    }

    /// Record one logical set using an advanced technique
    ///
    /// The technique's toggle must be enabled for the active exercise.
    pub fn record_technique_set(&mut self, input: SetInput, technique: Technique) -> Result<Transition> {
        self.ensure_in_progress("record a set")?;
        let toggle = technique.toggle();
        if !self.variations.is_enabled(toggle) {
            return Err(Error::InvalidState(format!(
                "{:?} is not enabled for this exercise",
                toggle
            )));
        }

        let now = (self.clock)();
        let record = self
            .variations
            .build(self.current_set_number, input, technique, now)?;
        self.commit(record)
    }

    fn commit(&mut self, record: SetRecord) -> Result<Transition> {
        let idx = self.current_exercise_index;

        tracing::debug!(
            "Recorded {} set {} for {}: {}x{} @ RPE {}",
            record.variation.label(),
            record.set_number,
            self.exercises[idx].id,
            record.weight,
            record.reps,
            record.rpe
        );

        self.hooks.set_completed(&record);
        self.logs[idx].sets.push(record);

        if self.current_set_number < self.current_target_sets() {
            self.current_set_number += 1;
            let rest_seconds = self.rest_table.rest_duration_for(&self.exercises[idx]);
            self.timer.start(rest_seconds);
            self.is_resting = rest_seconds > 0;
            self.refresh_prefill(true);

            Ok(Transition::NextSet {
                set_number: self.current_set_number,
                rest_seconds,
                prefill: self.prefill,
            })
        } else {
            Ok(self.move_to_next_exercise(false))
        }
    }

    /// Move on to the next exercise, keeping whatever was recorded
    ///
    /// On the last exercise this completes the session.
    pub fn advance_exercise(&mut self) -> Result<Transition> {
        self.ensure_in_progress("advance the exercise")?;
        Ok(self.move_to_next_exercise(false))
    }

    /// Move on and drop the exercise from the totals
    ///
    /// Sets recorded before the skip end up in `discarded_sets`.
    pub fn skip_exercise(&mut self) -> Result<Transition> {
        self.ensure_in_progress("skip the exercise")?;
        tracing::info!(
            "Skipping {} after {} sets",
            self.exercises[self.current_exercise_index].id,
            self.logs[self.current_exercise_index].sets.len()
        );
        Ok(self.move_to_next_exercise(true))
    }

    /// End the workout now
    ///
    /// Partial work on the current exercise counts. The current exercise
    /// without any sets and every later one are marked skipped.
    pub fn finish(&mut self) -> Result<WorkoutSummary> {
        self.ensure_in_progress("finish the session")?;

        let current = self.current_exercise_index;
        if self.logs[current].sets.is_empty() {
            self.logs[current].skipped = true;
        }
        for log in self.logs.iter_mut().skip(current + 1) {
            log.skipped = true;
        }

        Ok(self.complete())
    }

    /// Allow one more set than the target for the active exercise
    pub fn add_set(&mut self) -> Result<u32> {
        self.ensure_in_progress("add a set")?;
        self.extra_sets += 1;
        Ok(self.current_target_sets())
    }

    /// End the rest early; the cursor is unaffected
    pub fn dismiss_rest(&mut self) {
        self.is_resting = false;
        self.timer.reset();
    }

    /// Hold the countdown; ticks are ignored until [`Self::resume_rest`]
    pub fn pause_rest(&mut self) {
        self.timer.pause();
    }

    pub fn resume_rest(&mut self) {
        self.timer.resume();
    }

    /// One second of rest elapsed
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != SessionPhase::InProgress {
            return TickOutcome::Inactive;
        }

        let outcome = self.timer.tick();
        if outcome == TickOutcome::Completed {
            self.is_resting = false;
            self.hooks
                .rest_completed(&self.exercises[self.current_exercise_index]);
        }
        outcome
    }

    /// Flip a technique toggle for the active exercise
    pub fn toggle_variation(&mut self, key: VariationKey, enabled: bool) -> Result<()> {
        if self.phase == SessionPhase::Completed {
            return Err(Error::InvalidState(
                "cannot change variations after the session completed".into(),
            ));
        }

        self.variations.toggle(key, enabled);
        if key == VariationKey::AutoProgression && self.phase == SessionPhase::InProgress {
            self.refresh_prefill(false);
        }
        Ok(())
    }

    /// Record a weight the user typed for the next set
    ///
    /// A manual weight wins over any suggestion until the set is recorded.
    pub fn set_manual_weight(&mut self, weight: f64) -> Result<()> {
        self.ensure_in_progress("edit the weight")?;
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::Validation(format!(
                "weight must be a non-negative number, got {}",
                weight
            )));
        }

        self.prefill = Prefill {
            weight,
            source: PrefillSource::Manual,
        };
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn ensure_in_progress(&self, action: &str) -> Result<()> {
        match self.phase {
            SessionPhase::InProgress => Ok(()),
            SessionPhase::NotStarted => Err(Error::InvalidState(format!(
                "cannot {} before the session has started",
                action
            ))),
            SessionPhase::Completed => Err(Error::InvalidState(format!(
                "cannot {} after the session has completed",
                action
            ))),
        }
    }

    fn move_to_next_exercise(&mut self, skipped: bool) -> Transition {
        let idx = self.current_exercise_index;
        if skipped {
            self.logs[idx].skipped = true;
        }

        if idx + 1 >= self.exercises.len() {
            return Transition::Completed(self.complete());
        }

        self.current_exercise_index += 1;
        self.current_set_number = 1;
        self.extra_sets = 0;
        self.is_resting = false;
        self.timer.reset();
        self.variations.reset_for_next_exercise();
        self.refresh_prefill(true);

        tracing::debug!(
            "Advanced to exercise {} ({})",
            self.current_exercise_index,
            self.exercises[self.current_exercise_index].id
        );

        Transition::NextExercise {
            exercise_index: self.current_exercise_index,
            prefill: self.prefill,
        }
    }

    fn complete(&mut self) -> WorkoutSummary {
        let completed_at = (self.clock)();
        let started_at = self.session_started_at.unwrap_or(completed_at);

        self.phase = SessionPhase::Completed;
        self.current_exercise_index = self.exercises.len();
        self.is_resting = false;
        self.timer.reset();
        self.prefill = Prefill::empty();

        let summary = build_summary(&self.exercises, &self.logs, started_at, completed_at);
        tracing::info!(
            "Session completed: {} sets, volume {:.1}, {}s",
            summary.total_sets,
            summary.total_volume,
            summary.duration_seconds
        );

        self.summary = Some(summary.clone());
        summary
    }

    /// Recompute the pre-fill; `force` replaces a manual value too
    fn refresh_prefill(&mut self, force: bool) {
        if !force && self.prefill.is_manual() {
            return;
        }

        self.prefill = match self.suggest_weight() {
            Some(weight) => Prefill {
                weight,
                source: PrefillSource::Suggested,
            },
            None => Prefill::empty(),
        };
    }

    /// Suggested weight for the set under the cursor, if there is a basis for one
    ///
    /// With auto-progression on and a Linear/Percentage policy, later sets are
    /// projected from the first set of the exercise. Otherwise the suggestion
    /// reacts to the RPE of the last set (this workout's, else history).
    fn suggest_weight(&self) -> Option<f64> {
        let exercise = self.exercises.get(self.current_exercise_index)?;
        let sets = &self.logs[self.current_exercise_index].sets;
        let policy = self.policy_for(&exercise.id);

        let projects = matches!(
            policy.kind,
            ProgressionKind::Linear | ProgressionKind::Percentage
        );
        if self.variations.is_enabled(VariationKey::AutoProgression) && projects {
            if let Some(first) = sets.first() {
                return Some(calculate_progressive_load(
                    self.current_set_number,
                    first.weight,
                    &policy,
                ));
            }
        }

        let last = sets.last().or_else(|| self.history.get(&exercise.id))?;
        Some(suggest_next_weight_with(
            &self.rpe_rules,
            Some(last),
            exercise.target_reps.max,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variation::DropInput;
    use crate::{DropEntry, ExerciseCategory, RepRange};
    use chrono::Duration;
    use std::sync::{Arc, Mutex};

    fn exercise(id: &str, sets: u32, rest: u32) -> Exercise {
        Exercise {
            id: id.into(),
            name: id.to_uppercase(),
            category: ExerciseCategory::CompoundBarbell,
            target_reps: RepRange::new(6, 8),
            target_sets: sets,
            rest_seconds: Some(rest),
        }
    }

    fn started(exercises: Vec<Exercise>) -> SessionController {
        let mut session = SessionController::new(exercises).unwrap();
        session.start().unwrap();
        session
    }

    #[derive(Default, Clone)]
    struct RecordingHooks {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl SessionHooks for RecordingHooks {
        fn set_completed(&mut self, record: &SetRecord) {
            self.events
                .lock()
                .unwrap()
                .push(format!("set:{}", record.set_number));
        }

        fn rest_completed(&mut self, exercise: &Exercise) {
            self.events
                .lock()
                .unwrap()
                .push(format!("rest:{}", exercise.id));
        }
    }

    #[test]
    fn test_end_to_end_two_exercises() {
        crate::logging::init_test();
        let mut session = started(vec![exercise("a", 2, 90), exercise("b", 1, 90)]);

        let t1 = session.record_set(SetInput::new(100.0, 8, 7.0)).unwrap();
        match t1 {
            Transition::NextSet {
                set_number,
                prefill,
                ..
            } => {
                assert_eq!(set_number, 2);
                assert_eq!(prefill.weight, 100.0);
                assert_eq!(prefill.source, PrefillSource::Suggested);
            }
            other => panic!("Expected next set, got {:?}", other),
        }
        assert!(session.is_resting());

        let t2 = session.record_set(SetInput::new(100.0, 8, 9.0)).unwrap();
        assert!(matches!(
            t2,
            Transition::NextExercise {
                exercise_index: 1,
                ..
            }
        ));
        assert_eq!(session.current_set_number(), 1);
        assert!(!session.is_resting());

        let t3 = session.record_set(SetInput::new(50.0, 10, 8.0)).unwrap();
        let summary = t3.summary().expect("session should be complete").clone();
        assert_eq!(summary.total_sets, 3);
        assert_eq!(summary.total_volume, 2100.0);
        assert_eq!(session.phase(), SessionPhase::Completed);
        assert_eq!(session.current_exercise_index(), 2);
        assert_eq!(session.summary(), Some(&summary));
    }

    #[test]
    fn test_operations_before_start_are_invalid() {
        let mut session = SessionController::new(vec![exercise("a", 1, 60)]).unwrap();
        let result = session.record_set(SetInput::new(10.0, 5, 7.0));
        assert!(matches!(result, Err(Error::InvalidState(_))));

        session.start().unwrap();
        assert!(matches!(session.start(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_new_rejects_bad_exercise_lists() {
        assert!(matches!(
            SessionController::new(vec![]),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            SessionController::new(vec![exercise("a", 0, 60)]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_validation_leaves_state_unchanged() {
        let mut session = started(vec![exercise("a", 3, 60)]);
        session.record_set(SetInput::new(60.0, 5, 8.0)).unwrap();

        for bad in [
            SetInput::new(-1.0, 5, 8.0),
            SetInput::new(60.0, -2, 8.0),
            SetInput::new(60.0, 5, 0.5),
            SetInput::new(60.0, 5, 11.0),
            SetInput::new(f64::NAN, 5, 8.0),
        ] {
            let err = session.record_set(bad).unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
            assert!(err.is_recoverable());
        }

        assert_eq!(session.current_set_number(), 2);
        assert_eq!(session.completed_sets_this_exercise().len(), 1);
    }

    #[test]
    fn test_terminal_state_rejects_everything() {
        let mut session = started(vec![exercise("a", 1, 60)]);
        session.record_set(SetInput::new(40.0, 10, 8.0)).unwrap();
        let summary = session.summary().cloned().unwrap();

        assert!(matches!(
            session.record_set(SetInput::new(40.0, 10, 8.0)),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(session.skip_exercise(), Err(Error::InvalidState(_))));
        assert!(matches!(session.advance_exercise(), Err(Error::InvalidState(_))));
        assert!(matches!(session.finish(), Err(Error::InvalidState(_))));
        assert!(session
            .toggle_variation(VariationKey::DropSets, true)
            .is_err());
        assert_eq!(session.summary(), Some(&summary));
        assert_eq!(session.tick(), TickOutcome::Inactive);
    }

    #[test]
    fn test_monotonic_cursor() {
        let mut session = started(vec![
            exercise("a", 2, 60),
            exercise("b", 3, 60),
            exercise("c", 1, 60),
            exercise("d", 2, 60),
        ]);

        let mut last_index = session.current_exercise_index();
        let steps = ["record", "skip", "record", "advance", "record", "record", "record"];
        for step in steps {
            let before_index = session.current_exercise_index();
            let before_set = session.current_set_number();
            match step {
                "record" => {
                    session.record_set(SetInput::new(50.0, 8, 8.0)).unwrap();
                }
                "skip" => {
                    session.skip_exercise().unwrap();
                }
                "advance" => {
                    session.advance_exercise().unwrap();
                }
                _ => unreachable!(),
            }

            let index = session.current_exercise_index();
            assert!(index >= last_index);
            if index != before_index && session.phase() == SessionPhase::InProgress {
                assert_eq!(session.current_set_number(), 1);
            } else if index == before_index {
                assert_eq!(session.current_set_number(), before_set + 1);
            }
            last_index = index;
        }

        assert_eq!(session.phase(), SessionPhase::Completed);
        assert_eq!(session.current_exercise_index(), 4);
    }

    #[test]
    fn test_advance_without_sets_moves_on() {
        let mut session = started(vec![exercise("a", 3, 60), exercise("b", 1, 60)]);
        let transition = session.advance_exercise().unwrap();
        assert!(matches!(
            transition,
            Transition::NextExercise {
                exercise_index: 1,
                ..
            }
        ));
        assert_eq!(session.current_set_number(), 1);

        let summary = session
            .record_set(SetInput::new(30.0, 10, 8.0))
            .unwrap()
            .summary()
            .cloned()
            .unwrap();

        assert_eq!(summary.exercises[0].volume, 0.0);
        assert!(summary.exercises[0].sets.is_empty());
        assert!(!summary.exercises[0].skipped);
        assert_eq!(summary.total_volume, 300.0);
    }

    #[test]
    fn test_advance_keeps_partial_sets() {
        let mut session = started(vec![exercise("a", 3, 60), exercise("b", 1, 60)]);
        session.record_set(SetInput::new(70.0, 6, 8.0)).unwrap();
        session.advance_exercise().unwrap();

        let summary = session
            .record_set(SetInput::new(30.0, 10, 8.0))
            .unwrap()
            .summary()
            .cloned()
            .unwrap();
        assert_eq!(summary.exercises[0].volume, 420.0);
        assert_eq!(summary.total_volume, 720.0);
    }

    #[test]
    fn test_skipped_exercise_contributes_zero_volume() {
        let mut session = started(vec![exercise("a", 3, 60), exercise("b", 1, 60)]);
        session.record_set(SetInput::new(100.0, 5, 8.0)).unwrap();
        session.skip_exercise().unwrap();

        let summary = session
            .record_set(SetInput::new(10.0, 10, 8.0))
            .unwrap()
            .summary()
            .cloned()
            .unwrap();

        assert!(summary.exercises[0].skipped);
        assert_eq!(summary.exercises[0].volume, 0.0);
        assert!(summary.exercises[0].sets.is_empty());
        assert_eq!(summary.exercises[0].discarded_sets.len(), 1);
        assert!(!summary.exercises[1].skipped);
        assert_eq!(summary.total_volume, 100.0);
        assert_eq!(summary.total_sets, 1);
    }

    #[test]
    fn test_skip_last_exercise_completes() {
        let mut session = started(vec![exercise("a", 2, 60)]);
        let transition = session.skip_exercise().unwrap();
        let summary = transition.summary().unwrap();
        assert_eq!(summary.total_volume, 0.0);
        assert_eq!(summary.total_sets, 0);
        assert_eq!(summary.skipped_count(), 1);
    }

    #[test]
    fn test_finish_marks_remaining_skipped() {
        let mut session = started(vec![
            exercise("a", 1, 60),
            exercise("b", 2, 60),
            exercise("c", 2, 60),
        ]);
        session.record_set(SetInput::new(80.0, 5, 8.0)).unwrap();
        session.record_set(SetInput::new(40.0, 10, 8.0)).unwrap();

        let summary = session.finish().unwrap();
        assert!(!summary.exercises[0].skipped);
        // One of two sets done: the partial work counts
        assert!(!summary.exercises[1].skipped);
        assert_eq!(summary.exercises[1].volume, 400.0);
        assert!(summary.exercises[2].skipped);
        assert_eq!(summary.total_sets, 2);
        assert_eq!(summary.total_volume, 800.0);
    }

    #[test]
    fn test_finish_before_any_set_skips_current() {
        let mut session = started(vec![exercise("a", 1, 60), exercise("b", 2, 60)]);
        session.record_set(SetInput::new(80.0, 5, 8.0)).unwrap();

        let summary = session.finish().unwrap();
        assert!(!summary.exercises[0].skipped);
        assert!(summary.exercises[1].skipped);
        assert_eq!(summary.skipped_count(), 1);
    }

    #[test]
    fn test_volume_conservation_with_drop_sets() {
        let mut session = started(vec![exercise("a", 2, 60), exercise("b", 1, 60)]);
        session.record_set(SetInput::new(100.0, 5, 8.0)).unwrap();

        session.toggle_variation(VariationKey::DropSets, true).unwrap();
        let transition = session
            .record_technique_set(
                SetInput::new(100.0, 5, 9.5),
                Technique::Drop(vec![DropInput::new(80.0, 4), DropInput::new(0.0, 4)]),
            )
            .unwrap();
        // The drop set is one logical set: it finished exercise A
        assert!(matches!(transition, Transition::NextExercise { .. }));
        // Drop toggle reset for the new exercise
        assert!(!session.variations().drop_sets);

        let summary = session
            .record_set(SetInput::new(20.0, 12, 7.0))
            .unwrap()
            .summary()
            .cloned()
            .unwrap();

        let expected = 100.0 * 5.0 + 100.0 * 5.0 + 80.0 * 4.0 + 20.0 * 12.0;
        assert_eq!(summary.total_volume, expected);
        assert_eq!(summary.total_sets, 3);
        assert_eq!(
            summary.exercises[0].sets[1].variation,
            VariationTag::Drop {
                drops: vec![DropEntry {
                    weight: 80.0,
                    reps: 4
                }]
            }
        );
    }

    #[test]
    fn test_technique_requires_toggle() {
        let mut session = started(vec![exercise("a", 2, 60)]);
        let result = session.record_technique_set(
            SetInput::new(50.0, 8, 8.0),
            Technique::Tempo("3-1-2-0".into()),
        );
        assert!(matches!(result, Err(Error::InvalidState(_))));
        assert!(session.completed_sets_this_exercise().is_empty());
    }

    #[test]
    fn test_drop_set_error_leaves_editor_state() {
        let mut session = started(vec![exercise("a", 2, 60)]);
        session.toggle_variation(VariationKey::DropSets, true).unwrap();
        let result = session.record_technique_set(
            SetInput::new(50.0, 8, 9.0),
            Technique::Drop(vec![DropInput::new(0.0, 5)]),
        );
        assert!(matches!(result, Err(Error::DropSetConfiguration(_))));
        assert_eq!(session.current_set_number(), 1);
        assert!(session.variations().drop_sets);
    }

    #[test]
    fn test_auto_progression_is_sticky() {
        let mut session = started(vec![exercise("a", 1, 60), exercise("b", 1, 60)]);
        session.toggle_variation(VariationKey::AutoProgression, true).unwrap();
        session.toggle_variation(VariationKey::RestPause, true).unwrap();
        session.record_set(SetInput::new(60.0, 8, 8.0)).unwrap();

        assert!(session.variations().auto_progression);
        assert!(!session.variations().rest_pause);
    }

    #[test]
    fn test_auto_progression_projects_linear_load() {
        let mut session = started(vec![exercise("a", 3, 60)])
            .with_policy(LoadProgression::linear(2.5))
            .with_auto_progression(true);
        // with_* after start only swaps settings; recompute on the next transition
        session.record_set(SetInput::new(100.0, 8, 9.5)).unwrap();
        assert_eq!(session.prefill().weight, 102.5);

        session.record_set(SetInput::new(102.5, 8, 9.5)).unwrap();
        assert_eq!(session.prefill().weight, 105.0);
    }

    #[test]
    fn test_auto_progression_compounds_percentage_load() {
        let mut session = started(vec![exercise("a", 3, 60)])
            .with_policy(LoadProgression::percentage(10.0))
            .with_auto_progression(true);
        session.record_set(SetInput::new(100.0, 8, 8.0)).unwrap();
        assert!((session.prefill().weight - 110.0).abs() < 1e-9);
        assert_eq!(session.prefill().source, PrefillSource::Suggested);

        session.record_set(SetInput::new(110.0, 8, 8.0)).unwrap();
        assert!(
            (session.prefill().weight - 121.0).abs() < 1e-9,
            "got {}",
            session.prefill().weight
        );
    }

    #[test]
    fn test_config_keeps_earlier_toggles() {
        let mut config = Config::default();
        config.progression.drop_decrement = 20.0;

        let mut session = SessionController::new(vec![exercise("a", 2, 60)])
            .unwrap()
            .with_auto_progression(true);
        session.toggle_variation(VariationKey::DropSets, true).unwrap();
        let mut session = session.with_config(&config);
        session.start().unwrap();

        assert!(session.variations().auto_progression);
        assert!(session.variations().drop_sets);

        session
            .record_technique_set(
                SetInput::new(100.0, 8, 9.0),
                Technique::Drop(vec![DropInput::suggested(6)]),
            )
            .unwrap();
        assert_eq!(
            session.completed_sets_this_exercise()[0].variation,
            VariationTag::Drop {
                drops: vec![DropEntry {
                    weight: 80.0,
                    reps: 6
                }]
            }
        );
    }

    #[test]
    fn test_rpe_suggestion_without_auto_progression() {
        let mut session = started(vec![exercise("a", 3, 60)]).with_policy(LoadProgression::linear(2.5));
        session.record_set(SetInput::new(100.0, 8, 9.0)).unwrap();
        assert_eq!(session.prefill().weight, 97.5);
    }

    #[test]
    fn test_manual_weight_not_overwritten_by_toggle() {
        let mut session = started(vec![exercise("a", 3, 60)]).with_policy(LoadProgression::linear(5.0));
        session.record_set(SetInput::new(100.0, 8, 8.0)).unwrap();
        session.set_manual_weight(110.0).unwrap();

        session.toggle_variation(VariationKey::AutoProgression, true).unwrap();
        assert_eq!(session.prefill().weight, 110.0);
        assert!(session.prefill().is_manual());

        // Recording consumes the manual value; the next pre-fill is a suggestion
        session.record_set(SetInput::new(110.0, 8, 8.0)).unwrap();
        assert_eq!(session.prefill().source, PrefillSource::Suggested);
        assert_eq!(session.prefill().weight, 110.0);
    }

    #[test]
    fn test_toggle_recomputes_clean_prefill() {
        let mut session = started(vec![exercise("a", 3, 60)]).with_policy(LoadProgression::linear(5.0));
        session.record_set(SetInput::new(100.0, 8, 8.0)).unwrap();
        assert_eq!(session.prefill().weight, 100.0);

        session.toggle_variation(VariationKey::AutoProgression, true).unwrap();
        assert_eq!(session.prefill().weight, 105.0);
    }

    #[test]
    fn test_history_prefills_first_set() {
        let mut history = HashMap::new();
        history.insert(
            "a".to_string(),
            SetInput::new(80.0, 8, 6.0)
                .into_record(3, VariationTag::Normal, Utc::now())
                .unwrap(),
        );
        let mut session = SessionController::new(vec![exercise("a", 2, 60)])
            .unwrap()
            .with_history(history);

        let prefill = session.start().unwrap();
        assert_eq!(prefill.weight, 82.5);
        assert_eq!(prefill.source, PrefillSource::Suggested);
    }

    #[test]
    fn test_no_history_leaves_prefill_empty() {
        let mut session = SessionController::new(vec![exercise("a", 2, 60)]).unwrap();
        let prefill = session.start().unwrap();
        assert_eq!(prefill, Prefill::empty());
    }

    #[test]
    fn test_rest_timer_drives_resting_and_hooks() {
        let hooks = RecordingHooks::default();
        let events = Arc::clone(&hooks.events);
        let mut session = SessionController::new(vec![exercise("a", 2, 3)])
            .unwrap()
            .with_hooks(hooks);
        session.start().unwrap();

        session.record_set(SetInput::new(50.0, 8, 8.0)).unwrap();
        assert!(session.is_resting());
        assert_eq!(session.rest_timer().remaining(), 3);

        assert_eq!(session.tick(), TickOutcome::Counting(2));
        assert_eq!(session.tick(), TickOutcome::Counting(1));
        assert_eq!(session.tick(), TickOutcome::Completed);
        assert_eq!(session.tick(), TickOutcome::Inactive);
        assert!(!session.is_resting());

        assert_eq!(*events.lock().unwrap(), vec!["set:1", "rest:a"]);
    }

    #[test]
    fn test_dismiss_rest_keeps_cursor() {
        let mut session = started(vec![exercise("a", 3, 120)]);
        session.record_set(SetInput::new(50.0, 8, 8.0)).unwrap();
        session.dismiss_rest();

        assert!(!session.is_resting());
        assert_eq!(session.current_set_number(), 2);
        assert_eq!(session.tick(), TickOutcome::Inactive);
    }

    #[test]
    fn test_paused_rest_ignores_ticks_until_resumed() {
        let mut session = started(vec![exercise("a", 3, 3)]);
        session.record_set(SetInput::new(50.0, 8, 8.0)).unwrap();
        assert_eq!(session.tick(), TickOutcome::Counting(2));

        session.pause_rest();
        assert_eq!(session.tick(), TickOutcome::Inactive);
        assert_eq!(session.tick(), TickOutcome::Inactive);
        assert_eq!(session.rest_timer().remaining(), 2);
        assert!(session.is_resting());

        session.resume_rest();
        assert_eq!(session.tick(), TickOutcome::Counting(1));
        assert_eq!(session.tick(), TickOutcome::Completed);
        assert!(!session.is_resting());
    }

    #[test]
    fn test_add_set_extends_exercise() {
        let mut session = started(vec![exercise("a", 1, 60), exercise("b", 1, 60)]);
        assert_eq!(session.add_set().unwrap(), 2);

        let transition = session.record_set(SetInput::new(50.0, 8, 8.0)).unwrap();
        assert!(matches!(transition, Transition::NextSet { set_number: 2, .. }));

        let transition = session.record_set(SetInput::new(50.0, 8, 8.0)).unwrap();
        assert!(matches!(transition, Transition::NextExercise { .. }));
        assert_eq!(session.current_target_sets(), 1);
    }

    #[test]
    fn test_duration_uses_clock() {
        let start = Utc::now();
        let now = Arc::new(Mutex::new(start));
        let clock_now = Arc::clone(&now);
        let mut session = SessionController::new(vec![exercise("a", 1, 60)])
            .unwrap()
            .with_clock(move || *clock_now.lock().unwrap());
        session.start().unwrap();

        *now.lock().unwrap() = start + Duration::minutes(45);
        let transition = session.record_set(SetInput::new(50.0, 8, 8.0)).unwrap();
        let summary = transition.summary().unwrap();

        assert_eq!(summary.duration_seconds, 45 * 60);
        assert_eq!(session.session_started_at(), Some(start));
    }
}
