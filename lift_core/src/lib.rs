#![forbid(unsafe_code)]

//! Core domain model and session engine for lift.
//!
//! This crate provides:
//! - Domain types (exercises, set records, variations, summaries)
//! - The live session state machine and rest timer
//! - Load progression and technique (drop set, rest-pause, ...) logic
//! - Catalog, configuration and settings
//! - Persistence collaborators (WAL, CSV rollup, history)

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod progression;
pub mod variation;
pub mod timer;
pub mod summary;
pub mod session;
pub mod state;
pub mod wal;
pub mod csv_rollup;
pub mod history;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, Plan, PlanEntry};
pub use config::Config;
pub use progression::{calculate_progressive_load, suggest_next_weight, RpeRules};
pub use variation::{DropInput, Technique, VariationManager};
pub use timer::{RestTable, RestTimer, TickOutcome, TimerState};
pub use session::{
    NoopHooks, Prefill, PrefillSource, SessionController, SessionHooks, SessionPhase, Transition,
};
pub use state::UserSettings;
pub use wal::{JsonlSink, SummarySink};
pub use history::load_last_sets;
