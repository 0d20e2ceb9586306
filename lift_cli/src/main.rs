mod input;

use clap::{Parser, Subcommand};
use input::{Command, RestCommand};
use lift_core::progression::{round_to_increment, suggest_next_weight_with};
use lift_core::*;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "lift")]
#[command(about = "Strength training session logger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workout session interactively
    Start {
        /// Built-in workout template (push, pull, legs, full)
        #[arg(long, conflicts_with = "plan")]
        template: Option<String>,

        /// Custom plan file (TOML)
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Skip the rest countdown between sets
        #[arg(long)]
        no_rest: bool,

        /// Dry run - show the workout without starting it
        #[arg(long)]
        dry_run: bool,
    },

    /// Roll up WAL workouts to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },

    /// Show the last logged set for an exercise and the next suggestion
    Last {
        /// Exercise id, e.g. bench_press
        exercise: String,
    },

    /// Set the load progression policy for an exercise
    Policy {
        /// Exercise id, e.g. bench_press
        exercise: String,

        /// linear, percentage, rpe or custom
        #[arg(long)]
        kind: String,

        /// Weight (linear) or percent (percentage) added per set
        #[arg(long, default_value_t = 0.0)]
        increment: f64,

        /// Target RPE (6-10)
        #[arg(long)]
        target_rpe: Option<f64>,
    },

    /// List the built-in workout templates
    Templates,
}

/// Files under the data directory
struct DataPaths {
    wal_dir: PathBuf,
    wal: PathBuf,
    csv: PathBuf,
    settings: PathBuf,
}

impl DataPaths {
    fn new(data_dir: &Path) -> Self {
        let wal_dir = data_dir.join("wal");
        Self {
            wal: wal_dir.join("workouts.wal"),
            wal_dir,
            csv: data_dir.join("sets.csv"),
            settings: data_dir.join("settings.json"),
        }
    }
}

fn main() -> Result<()> {
    lift_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let paths = DataPaths::new(&data_dir);

    match cli.command {
        Some(Commands::Start {
            template,
            plan,
            no_rest,
            dry_run,
        }) => cmd_start(&paths, template, plan, no_rest, dry_run, &config),
        Some(Commands::Rollup { cleanup }) => cmd_rollup(&paths, cleanup),
        Some(Commands::Last { exercise }) => cmd_last(&paths, &exercise, &config),
        Some(Commands::Policy {
            exercise,
            kind,
            increment,
            target_rpe,
        }) => cmd_policy(&paths, &exercise, &kind, increment, target_rpe),
        Some(Commands::Templates) | None => cmd_templates(),
    }
}

// ============================================================================
// start
// ============================================================================

fn cmd_start(
    paths: &DataPaths,
    template: Option<String>,
    plan: Option<PathBuf>,
    no_rest: bool,
    dry_run: bool,
    config: &Config,
) -> Result<()> {
    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Catalog("Invalid catalog".into()));
    }

    let (title, exercises) = match plan {
        Some(path) => {
            let plan = Plan::load_from(&path)?;
            let exercises = plan.resolve(catalog)?;
            (plan.name, exercises)
        }
        None => {
            let id = template.unwrap_or_else(|| "full".to_string());
            let exercises = catalog.template_exercises(&id)?;
            (catalog.templates[&id].name.clone(), exercises)
        }
    };

    let settings = UserSettings::load(&paths.settings)?;
    let history = load_last_sets(&paths.wal, &paths.csv, config.progression.history_days)?;

    tracing::info!(
        "Starting '{}' with {} exercises, history for {}",
        title,
        exercises.len(),
        history.len()
    );
    display_plan(&title, &exercises, &history, config);

    if dry_run {
        println!("\n[Dry run - not starting session]");
        return Ok(());
    }

    let mut session = SessionController::new(exercises)?
        .with_config(config)
        .with_history(history)
        .with_auto_progression(settings.auto_progression)
        .with_hooks(TerminalCues);
    for (exercise_id, policy) in &settings.policies {
        session = session.with_exercise_policy(exercise_id.clone(), *policy);
    }

    let tick = Duration::from_millis(config.timer.tick_millis);
    let summary = run_session(&mut session, no_rest, tick)?;

    display_summary(&summary);

    let auto = session.variations().get(VariationKey::AutoProgression);
    if auto != settings.auto_progression {
        UserSettings::update(&paths.settings, |s| {
            s.auto_progression = auto;
            Ok(())
        })?;
    }

    if summary.total_sets == 0 {
        println!("No sets recorded - nothing to log.");
        return Ok(());
    }

    // The summary is already final; a failed append only loses persistence
    let mut sink = JsonlSink::new(&paths.wal);
    if let Err(e) = sink.append(&summary) {
        tracing::warn!("WAL append failed for workout {}: {}", summary.id, e);
        eprintln!("✗ Failed to save workout: {}", e);
        return Err(e);
    }

    println!("✓ Workout logged!");
    Ok(())
}

fn run_session(
    session: &mut SessionController,
    no_rest: bool,
    tick: Duration,
) -> Result<WorkoutSummary> {
    let mut prefill = session.start()?;
    display_exercise(session);

    let lines = spawn_input();
    // A command typed during rest, waiting to run
    let mut pending: Option<String> = None;

    loop {
        let line = match pending.take() {
            Some(line) => line,
            None => {
                prompt(session, prefill)?;
                match lines.recv() {
                    Ok(line) => line?,
                    Err(_) => {
                        println!();
                        println!("End of input - finishing workout.");
                        return session.finish();
                    }
                }
            }
        };

        let command = match input::parse(&line, prefill) {
            Ok(command) => command,
            Err(e) => {
                println!("  ✗ {}", e);
                continue;
            }
        };

        let outcome = match command {
            Command::Help => {
                println!("{}", input::HELP);
                continue;
            }
            Command::Finish => return session.finish(),
            Command::AddSet => {
                let target = session.add_set()?;
                println!("  {} sets planned for this exercise", target);
                continue;
            }
            Command::Weight(weight) => {
                report(session.set_manual_weight(weight))?;
                prefill = session.prefill();
                continue;
            }
            Command::Toggle(key, enabled) => {
                if report(session.toggle_variation(key, enabled))? {
                    println!("  {:?} {}", key, if enabled { "on" } else { "off" });
                }
                prefill = session.prefill();
                continue;
            }
            Command::Set(input) => session.record_set(input),
            Command::Technique(input, technique) => session.record_technique_set(input, technique),
            Command::Next => session.advance_exercise(),
            Command::Skip => session.skip_exercise(),
        };

        match outcome {
            Ok(Transition::NextSet {
                rest_seconds,
                prefill: next,
                ..
            }) => {
                prefill = next;
                if rest_seconds > 0 {
                    if no_rest {
                        session.dismiss_rest();
                    } else {
                        pending = rest(session, &lines, tick)?;
                    }
                }
            }
            Ok(Transition::NextExercise { prefill: next, .. }) => {
                prefill = next;
                display_exercise(session);
            }
            Ok(Transition::Completed(summary)) => return Ok(summary),
            Err(e) if e.is_recoverable() || matches!(e, Error::InvalidState(_)) => {
                println!("  ✗ {}", e);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Print an error the user can fix by typing something else
fn report(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_recoverable() || matches!(e, Error::InvalidState(_)) => {
            println!("  ✗ {}", e);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Read stdin on its own thread so the rest countdown can run between lines
fn spawn_input() -> Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Count the rest down, one tick per `tick`, while watching for input
///
/// Returns a line that ended the rest and still has to run as a command.
fn rest(
    session: &mut SessionController,
    lines: &Receiver<io::Result<String>>,
    tick: Duration,
) -> Result<Option<String>> {
    println!(
        "  Resting {}s... (Enter skips, p pauses, r resumes)",
        session.rest_timer().remaining()
    );

    while session.is_resting() {
        match lines.recv_timeout(tick) {
            Ok(line) => {
                let line = line?;
                match input::parse_rest(&line) {
                    RestCommand::Dismiss => {
                        session.dismiss_rest();
                        println!("  Rest skipped");
                    }
                    RestCommand::Pause => {
                        session.pause_rest();
                        println!("  Rest paused at {}s", session.rest_timer().remaining());
                    }
                    RestCommand::Resume => {
                        session.resume_rest();
                        println!("  Rest resumed");
                    }
                    RestCommand::Forward => {
                        session.dismiss_rest();
                        return Ok(Some(line));
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if let TickOutcome::Counting(remaining) = session.tick() {
                    if remaining % 30 == 0 {
                        println!("  {}s left", remaining);
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                session.dismiss_rest();
                break;
            }
        }
    }
    Ok(None)
}

fn prompt(session: &SessionController, prefill: Prefill) -> Result<()> {
    let Some(exercise) = session.current_exercise() else {
        return Ok(());
    };

    let weight = match prefill.source {
        PrefillSource::Empty => "enter weight".to_string(),
        PrefillSource::Suggested => format!("{} kg suggested", prefill.weight),
        PrefillSource::Manual => format!("{} kg", prefill.weight),
    };
    print!(
        "{} set {}/{} ({} reps, {}) > ",
        exercise.name,
        session.current_set_number(),
        session.current_target_sets(),
        exercise.target_reps,
        weight
    );
    io::stdout().flush()?;
    Ok(())
}

/// Rest-over and set-logged cues for a terminal
struct TerminalCues;

impl SessionHooks for TerminalCues {
    fn set_completed(&mut self, record: &SetRecord) {
        println!(
            "  ✓ Set {}: {} kg x {} @ RPE {} ({} kg volume)",
            record.set_number,
            record.weight,
            record.reps,
            record.rpe,
            record.volume()
        );
    }

    fn rest_completed(&mut self, exercise: &Exercise) {
        println!("\x07  ⏰ Rest over - back to {}", exercise.name);
    }
}

// ============================================================================
// Other commands
// ============================================================================

fn cmd_rollup(paths: &DataPaths, cleanup: bool) -> Result<()> {
    if !paths.wal.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = lift_core::csv_rollup::wal_to_csv_and_archive(&paths.wal, &paths.csv)?;

    println!("✓ Rolled up {} workouts to CSV", count);
    println!("  CSV: {}", paths.csv.display());

    if cleanup {
        let cleaned = lift_core::csv_rollup::cleanup_processed_wals(&paths.wal_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}

fn cmd_last(paths: &DataPaths, exercise_id: &str, config: &Config) -> Result<()> {
    let days = config.progression.history_days;
    let history = load_last_sets(&paths.wal, &paths.csv, days)?;

    let Some(set) = history.get(exercise_id) else {
        println!("No sets logged for '{}' in the last {} days.", exercise_id, days);
        return Ok(());
    };

    println!(
        "Last {}: {} kg x {} @ RPE {} on {}",
        exercise_id,
        set.weight,
        set.reps,
        set.rpe,
        set.recorded_at.format("%Y-%m-%d")
    );

    let target_reps = get_default_catalog()
        .exercises
        .get(exercise_id)
        .map(|e| e.target_reps.min)
        .unwrap_or(set.reps);
    let next = round_to_increment(
        suggest_next_weight_with(&config.progression.rpe_rules(), Some(set), target_reps),
        config.progression.plate_increment,
    );
    println!("Next: {} kg", next);
    Ok(())
}

fn cmd_policy(
    paths: &DataPaths,
    exercise_id: &str,
    kind: &str,
    increment: f64,
    target_rpe: Option<f64>,
) -> Result<()> {
    let policy = LoadProgression {
        kind: kind.parse()?,
        increment,
        target_rpe,
    };

    if !get_default_catalog().exercises.contains_key(exercise_id) {
        println!("Note: '{}' is not a built-in exercise.", exercise_id);
    }

    UserSettings::update(&paths.settings, |settings| {
        settings.set_policy(exercise_id, policy)
    })?;

    println!("✓ {} now uses {:?} progression", exercise_id, policy.kind);
    Ok(())
}

fn cmd_templates() -> Result<()> {
    let catalog = get_default_catalog();
    for id in catalog.template_ids() {
        let template = &catalog.templates[id];
        println!("{} - {}", id, template.name);
        for exercise_id in &template.exercise_ids {
            if let Some(exercise) = catalog.exercises.get(exercise_id) {
                println!(
                    "    {} ({} x {})",
                    exercise.name, exercise.target_sets, exercise.target_reps
                );
            }
        }
    }
    Ok(())
}

// ============================================================================
// Display
// ============================================================================

fn display_plan(
    title: &str,
    exercises: &[Exercise],
    history: &HashMap<String, SetRecord>,
    config: &Config,
) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", title.to_uppercase());
    println!("╰─────────────────────────────────────────╯");
    println!();

    for (i, exercise) in exercises.iter().enumerate() {
        println!(
            "  {}. {} - {} x {} reps, rest {}s",
            i + 1,
            exercise.name,
            exercise.target_sets,
            exercise.target_reps,
            config.rest.rest_duration_for(exercise)
        );
        if let Some(last) = history.get(&exercise.id) {
            println!(
                "     last: {} kg x {} @ RPE {}",
                last.weight, last.reps, last.rpe
            );
        }
    }
}

fn display_exercise(session: &SessionController) {
    if let Some(exercise) = session.current_exercise() {
        println!();
        println!(
            "── {} ({}/{}) ──",
            exercise.name,
            session.current_exercise_index() + 1,
            session.exercises().len()
        );
    }
}

fn display_summary(summary: &WorkoutSummary) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  WORKOUT COMPLETE");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Duration: {} min", summary.duration_seconds / 60);
    println!("  Sets: {}", summary.total_sets);
    println!("  Volume: {} kg", summary.total_volume);
    println!();

    for exercise in &summary.exercises {
        let status = if exercise.skipped { " (skipped)" } else { "" };
        println!(
            "  {}{}: {} sets, {} kg",
            exercise.name,
            status,
            exercise.sets.len(),
            exercise.volume
        );
        for set in &exercise.sets {
            let technique = match set.variation {
                VariationTag::Normal => String::new(),
                ref tag => format!(" [{}]", tag.label()),
            };
            println!(
                "    {}. {} kg x {} @ RPE {}{}",
                set.set_number, set.weight, set.reps, set.rpe, technique
            );
        }
        if !exercise.discarded_sets.is_empty() {
            println!(
                "    ({} sets before the skip not counted)",
                exercise.discarded_sets.len()
            );
        }
    }
    println!();
}
