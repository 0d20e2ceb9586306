//! Configuration file support for lift.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/lift/config.toml`.

use crate::progression::{RpeRules, DEFAULT_RPE_STEP};
use crate::timer::RestTable;
use crate::variation::DEFAULT_DROP_DECREMENT;
use crate::{Error, LoadProgression, ProgressionKind, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub rest: RestTable,

    #[serde(default)]
    pub progression: ProgressionConfig,

    #[serde(default)]
    pub timer: TimerConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Load progression parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default = "default_kind")]
    pub kind: ProgressionKind,

    #[serde(default)]
    pub increment: f64,

    #[serde(default = "default_target_rpe")]
    pub target_rpe: Option<f64>,

    #[serde(default = "default_easy_rpe_max")]
    pub easy_rpe_max: f64,

    #[serde(default = "default_hard_rpe_min")]
    pub hard_rpe_min: f64,

    #[serde(default = "default_rpe_step")]
    pub rpe_step: f64,

    #[serde(default = "default_drop_decrement")]
    pub drop_decrement: f64,

    #[serde(default = "default_plate_increment")]
    pub plate_increment: f64,

    #[serde(default = "default_history_days")]
    pub history_days: i64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            increment: 0.0,
            target_rpe: default_target_rpe(),
            easy_rpe_max: default_easy_rpe_max(),
            hard_rpe_min: default_hard_rpe_min(),
            rpe_step: default_rpe_step(),
            drop_decrement: default_drop_decrement(),
            plate_increment: default_plate_increment(),
            history_days: default_history_days(),
        }
    }
}

impl ProgressionConfig {
    pub fn rpe_rules(&self) -> RpeRules {
        RpeRules {
            easy_max: self.easy_rpe_max,
            hard_min: self.hard_rpe_min,
            step: self.rpe_step,
        }
    }

    pub fn default_policy(&self) -> LoadProgression {
        LoadProgression {
            kind: self.kind,
            increment: self.increment,
            target_rpe: self.target_rpe,
        }
    }
}

/// Rest timer cadence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Wall-clock length of one timer tick
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_millis: default_tick_millis(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    base.join("lift")
}

fn default_kind() -> ProgressionKind {
    ProgressionKind::RpeBased
}

fn default_target_rpe() -> Option<f64> {
    Some(8.0)
}

fn default_easy_rpe_max() -> f64 {
    6.0
}

fn default_hard_rpe_min() -> f64 {
    9.0
}

fn default_rpe_step() -> f64 {
    DEFAULT_RPE_STEP
}

fn default_drop_decrement() -> f64 {
    DEFAULT_DROP_DECREMENT
}

fn default_plate_increment() -> f64 {
    2.5
}

fn default_history_days() -> i64 {
    30
}

fn default_tick_millis() -> u64 {
    1000
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let p = &self.progression;
        if !(1.0..=10.0).contains(&p.easy_rpe_max) || !(1.0..=10.0).contains(&p.hard_rpe_min) {
            return Err(Error::Config("RPE thresholds must be between 1 and 10".into()));
        }
        if p.easy_rpe_max >= p.hard_rpe_min {
            return Err(Error::Config(format!(
                "easy_rpe_max ({}) must be below hard_rpe_min ({})",
                p.easy_rpe_max, p.hard_rpe_min
            )));
        }
        if p.rpe_step < 0.0 || p.drop_decrement < 0.0 || p.plate_increment < 0.0 {
            return Err(Error::Config("weight steps must be non-negative".into()));
        }
        p.default_policy()
            .validate()
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("lift").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.progression.kind, ProgressionKind::RpeBased);
        assert_eq!(config.progression.rpe_step, 2.5);
        assert_eq!(config.progression.drop_decrement, 10.0);
        assert_eq!(config.rest.compound_barbell, 180);
        assert_eq!(config.timer.tick_millis, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.rest, parsed.rest);
        assert_eq!(config.progression.kind, parsed.progression.kind);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[rest]
isolation = 45

[progression]
kind = "linear"
increment = 5.0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.rest.isolation, 45);
        assert_eq!(config.rest.compound_barbell, 180); // default
        assert_eq!(config.progression.default_policy(), LoadProgression::linear(5.0).with_target(Some(8.0)));
        assert_eq!(config.progression.hard_rpe_min, 9.0);
    }

    #[test]
    fn test_inverted_rpe_thresholds_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[progression]\neasy_rpe_max = 9.0\nhard_rpe_min = 7.0\n",
        )
        .unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.progression.drop_decrement = 5.0;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.progression.drop_decrement, 5.0);
    }
}
