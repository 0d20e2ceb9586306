//! Parsing of the one-line commands typed during a session.

use lift_core::{DropInput, Error, Prefill, PrefillSource, Result, SetInput, Technique, VariationKey};

/// Pause between rest-pause mini-sets
const REST_PAUSE_SECONDS: u32 = 15;

/// Rest between cluster blocks
const CLUSTER_REST_SECONDS: u32 = 20;

/// A parsed session command
#[derive(Debug, PartialEq)]
pub enum Command {
    Set(SetInput),
    Technique(SetInput, Technique),
    Skip,
    Next,
    Finish,
    AddSet,
    Weight(f64),
    Toggle(VariationKey, bool),
    Help,
}

/// What a line typed during rest means
#[derive(Debug, PartialEq)]
pub enum RestCommand {
    Dismiss,
    Pause,
    Resume,
    /// Ends the rest; the line runs as a session command
    Forward,
}

pub const HELP: &str = "\
  <weight> <reps> <rpe> [notes]   log a set
  <reps> <rpe> [notes]            log a set at the suggested weight
  w <weight>                      set the weight for the next set
  d <w> <r> <rpe> <w>x<r> ...     drop set (x<r> = suggested drop weight)
  rp <w> <r> <rpe> <reps> ...     rest-pause with extra mini-sets
  c <w> <rpe> <reps> <reps> ...   cluster set
  m <w> <r> <rpe>                 mechanical drop set
  t <pattern> <w> <r> <rpe>       tempo set, e.g. t 3-1-2-0 60 8 8
  +<variation> / -<variation>     enable/disable drop, rest_pause, cluster,
                                  mechanical, tempo, auto
  +                               add an extra set to this exercise
  n                               next exercise, keeping its sets
  s                               skip exercise (its sets are not counted)
  q                               finish workout now
  ?                               help
while resting:
  <Enter>                         end the rest
  p / r                           pause / resume the countdown
  any other command               end the rest and run it";

/// Parse one input line
pub fn parse(line: &str, prefill: Prefill) -> Result<Command> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&head) = tokens.first() else {
        return Err(Error::Validation("enter a set or '?' for help".into()));
    };

    match head {
        "?" | "h" | "help" => Ok(Command::Help),
        "s" | "skip" => Ok(Command::Skip),
        "n" | "next" => Ok(Command::Next),
        "q" | "quit" | "finish" => Ok(Command::Finish),
        "+" => Ok(Command::AddSet),
        "w" => {
            let weight = number(tokens.get(1), "weight")?;
            Ok(Command::Weight(weight))
        }
        "d" => {
            let input = full_set(&tokens[1..])?;
            let drops = tokens[4..]
                .iter()
                .map(|t| parse_drop(t))
                .collect::<Result<Vec<_>>>()?;
            Ok(Command::Technique(input, Technique::Drop(drops)))
        }
        "rp" => {
            let input = full_set(&tokens[1..])?;
            let mini_sets = reps_list(&tokens[4..])?;
            Ok(Command::Technique(
                input,
                Technique::RestPause {
                    mini_sets,
                    pause_seconds: REST_PAUSE_SECONDS,
                },
            ))
        }
        "c" => {
            let weight = number(tokens.get(1), "weight")?;
            let rpe = number(tokens.get(2), "rpe")?;
            let blocks = reps_list(tokens.get(3..).unwrap_or_default())?;
            Ok(Command::Technique(
                SetInput::new(weight, 0, rpe),
                Technique::Cluster {
                    blocks,
                    intra_rest_seconds: CLUSTER_REST_SECONDS,
                },
            ))
        }
        "m" => Ok(Command::Technique(
            full_set(&tokens[1..])?,
            Technique::MechanicalDrop,
        )),
        "t" => {
            let pattern = tokens
                .get(1)
                .ok_or_else(|| Error::Validation("missing tempo pattern".into()))?;
            Ok(Command::Technique(
                full_set(&tokens[2..])?,
                Technique::Tempo(pattern.to_string()),
            ))
        }
        toggle if toggle.len() > 1 && (toggle.starts_with('+') || toggle.starts_with('-'))
            && toggle[1..].parse::<f64>().is_err() =>
        {
            let key: VariationKey = toggle[1..].parse()?;
            Ok(Command::Toggle(key, toggle.starts_with('+')))
        }
        _ => parse_set(&tokens, prefill),
    }
}

/// Parse a line typed while the rest countdown runs
pub fn parse_rest(line: &str) -> RestCommand {
    match line.trim() {
        "" | "go" => RestCommand::Dismiss,
        "p" | "pause" => RestCommand::Pause,
        "r" | "resume" => RestCommand::Resume,
        _ => RestCommand::Forward,
    }
}

/// `<weight> <reps> <rpe> [notes]` or `<reps> <rpe> [notes]`
fn parse_set(tokens: &[&str], prefill: Prefill) -> Result<Command> {
    let numeric = tokens
        .iter()
        .take_while(|t| t.parse::<f64>().is_ok())
        .count();

    let (input, rest) = if numeric >= 3 {
        (full_set(tokens)?, &tokens[3..])
    } else if numeric == 2 {
        if prefill.source == PrefillSource::Empty {
            return Err(Error::Validation(
                "no suggested weight yet; enter <weight> <reps> <rpe>".into(),
            ));
        }
        let reps = integer(tokens.first(), "reps")?;
        let rpe = number(tokens.get(1), "rpe")?;
        (SetInput::new(prefill.weight, reps, rpe), &tokens[2..])
    } else {
        return Err(Error::Validation(format!(
            "could not read '{}'; '?' shows the commands",
            tokens.join(" ")
        )));
    };

    Ok(Command::Set(input.with_notes(rest.join(" "))))
}

fn full_set(tokens: &[&str]) -> Result<SetInput> {
    let weight = number(tokens.first(), "weight")?;
    let reps = integer(tokens.get(1), "reps")?;
    let rpe = number(tokens.get(2), "rpe")?;
    Ok(SetInput::new(weight, reps, rpe))
}

/// `80x6` or `x6` (weight left to the suggestion)
fn parse_drop(token: &str) -> Result<DropInput> {
    let (weight, reps) = token
        .split_once(['x', 'X'])
        .ok_or_else(|| Error::Validation(format!("drop '{}' should look like 80x6", token)))?;
    let reps = reps
        .parse::<u32>()
        .map_err(|_| Error::Validation(format!("invalid drop reps in '{}'", token)))?;

    if weight.is_empty() {
        return Ok(DropInput::suggested(reps));
    }
    let weight = weight
        .parse::<f64>()
        .map_err(|_| Error::Validation(format!("invalid drop weight in '{}'", token)))?;
    Ok(DropInput::new(weight, reps))
}

fn reps_list(tokens: &[&str]) -> Result<Vec<u32>> {
    tokens
        .iter()
        .map(|t| {
            t.parse::<u32>()
                .map_err(|_| Error::Validation(format!("invalid reps '{}'", t)))
        })
        .collect()
}

fn number(token: Option<&&str>, what: &str) -> Result<f64> {
    let token = token.ok_or_else(|| Error::Validation(format!("missing {}", what)))?;
    token
        .parse::<f64>()
        .map_err(|_| Error::Validation(format!("invalid {} '{}'", what, token)))
}

fn integer(token: Option<&&str>, what: &str) -> Result<i32> {
    let token = token.ok_or_else(|| Error::Validation(format!("missing {}", what)))?;
    token
        .parse::<i32>()
        .map_err(|_| Error::Validation(format!("invalid {} '{}'", what, token)))
}
