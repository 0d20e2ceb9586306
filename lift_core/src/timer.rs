//! Rest countdown between sets.
//!
//! The timer has no thread of its own. The host calls [`RestTimer::tick`] once
//! per second; the timer owns at most one completion callback, which is
//! dropped on reset so nothing fires after cancellation.

use crate::{Exercise, ExerciseCategory};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Callback fired once when a countdown reaches zero
pub type CompletionCallback = Box<dyn FnOnce(u32) + Send>;

/// Phase of the countdown
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Result of a single tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer is not running; nothing happened
    Inactive,
    /// One second elapsed; this many remain
    Counting(u32),
    /// The countdown just reached zero (returned exactly once per run)
    Completed,
}

/// Countdown state machine: Idle -> Running <-> Paused -> Completed
pub struct RestTimer {
    duration: u32,
    remaining: u32,
    state: TimerState,
    on_complete: Option<CompletionCallback>,
}

impl fmt::Debug for RestTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestTimer")
            .field("duration", &self.duration)
            .field("remaining", &self.remaining)
            .field("state", &self.state)
            .field("has_callback", &self.on_complete.is_some())
            .finish()
    }
}

impl Default for RestTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl RestTimer {
    pub fn new() -> Self {
        Self {
            duration: 0,
            remaining: 0,
            state: TimerState::Idle,
            on_complete: None,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Start a countdown, replacing any run in progress
    pub fn start(&mut self, duration: u32) {
        self.on_complete = None;
        self.begin(duration);
    }

    /// Start a countdown with a completion callback
    pub fn start_with<F>(&mut self, duration: u32, on_complete: F)
    where
        F: FnOnce(u32) + Send + 'static,
    {
        self.on_complete = Some(Box::new(on_complete));
        self.begin(duration);
    }

    fn begin(&mut self, duration: u32) {
        self.duration = duration;
        self.remaining = duration;
        self.state = TimerState::Running;
        tracing::debug!("Rest timer started for {}s", duration);

        // A zero-length rest is over as soon as it starts
        if duration == 0 {
            self.complete();
        }
    }

    /// Pause a running countdown; no-op in any other state
    pub fn pause(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Paused;
            tracing::debug!("Rest timer paused at {}s", self.remaining);
        }
    }

    /// Resume a paused countdown; no-op in any other state
    pub fn resume(&mut self) {
        if self.state == TimerState::Paused {
            self.state = TimerState::Running;
            tracing::debug!("Rest timer resumed at {}s", self.remaining);
        }
    }

    /// Return to Idle with a full duration and drop any pending callback
    pub fn reset(&mut self) {
        self.on_complete = None;
        self.remaining = self.duration;
        self.state = TimerState::Idle;
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != TimerState::Running {
            return TickOutcome::Inactive;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.complete();
            TickOutcome::Completed
        } else {
            TickOutcome::Counting(self.remaining)
        }
    }

    fn complete(&mut self) {
        self.state = TimerState::Completed;
        self.remaining = 0;
        tracing::debug!("Rest timer completed after {}s", self.duration);
        if let Some(callback) = self.on_complete.take() {
            callback(self.duration);
        }
    }
}

/// Default rest per exercise category, in seconds
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RestTable {
    #[serde(default = "default_compound_barbell")]
    pub compound_barbell: u32,
    #[serde(default = "default_compound_machine")]
    pub compound_machine: u32,
    #[serde(default = "default_bodyweight")]
    pub bodyweight: u32,
    #[serde(default = "default_isolation")]
    pub isolation: u32,
    #[serde(default = "default_accessory")]
    pub accessory: u32,
    #[serde(default = "default_conditioning")]
    pub conditioning: u32,
}

impl Default for RestTable {
    fn default() -> Self {
        Self {
            compound_barbell: default_compound_barbell(),
            compound_machine: default_compound_machine(),
            bodyweight: default_bodyweight(),
            isolation: default_isolation(),
            accessory: default_accessory(),
            conditioning: default_conditioning(),
        }
    }
}

fn default_compound_barbell() -> u32 {
    180
}

fn default_compound_machine() -> u32 {
    120
}

fn default_bodyweight() -> u32 {
    90
}

fn default_isolation() -> u32 {
    60
}

fn default_accessory() -> u32 {
    60
}

fn default_conditioning() -> u32 {
    45
}

impl RestTable {
    pub fn seconds_for(&self, category: ExerciseCategory) -> u32 {
        match category {
            ExerciseCategory::CompoundBarbell => self.compound_barbell,
            ExerciseCategory::CompoundMachine => self.compound_machine,
            ExerciseCategory::Bodyweight => self.bodyweight,
            ExerciseCategory::Isolation => self.isolation,
            ExerciseCategory::Accessory => self.accessory,
            ExerciseCategory::Conditioning => self.conditioning,
        }
    }

    /// Rest for an exercise: its own setting when present, else the category default
    pub fn rest_duration_for(&self, exercise: &Exercise) -> u32 {
        match exercise.rest_seconds {
            Some(seconds) if seconds > 0 => seconds,
            _ => self.seconds_for(exercise.category),
        }
    }
}
