//! User settings persistence with file locking.
//!
//! Holds the preferences the session engine does not persist itself: the
//! sticky auto-progression choice and per-exercise load progression policies.

use crate::{Error, LoadProgression, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Preferences injected into a session at creation time
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct UserSettings {
    #[serde(default)]
    pub auto_progression: bool,
    #[serde(default)]
    pub policies: HashMap<String, LoadProgression>,
}

impl UserSettings {
    /// Policy saved for an exercise, if any
    pub fn policy_for(&self, exercise_id: &str) -> Option<LoadProgression> {
        self.policies.get(exercise_id).copied()
    }

    /// Store a validated policy for an exercise
    pub fn set_policy(&mut self, exercise_id: impl Into<String>, policy: LoadProgression) -> Result<()> {
        policy.validate()?;
        self.policies.insert(exercise_id.into(), policy);
        Ok(())
    }

    /// Load settings from a file with shared locking
    ///
    /// Returns default settings if file doesn't exist.
    /// If file is corrupted, logs a warning and returns default settings.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No settings file found, using default settings");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    "Unable to open settings file {:?}: {}. Using defaults.",
                    path,
                    e
                );
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!(
                "Unable to lock settings file {:?}: {}. Using defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!(
                "Failed to read settings file {:?}: {}. Using defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<UserSettings>(&contents) {
            Ok(settings) => {
                tracing::debug!("Loaded user settings from {:?}", path);
                Ok(settings)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse settings file {:?}: {}. Using defaults.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Save settings to a file with exclusive locking
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Other(format!("settings path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        // Create unique temp file in the same directory for atomic rename
        let temp = NamedTempFile::new_in(parent)?;

        // Acquire exclusive lock on the temp file to serialize concurrent writers
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved user settings to {:?}", path);
        Ok(())
    }

    /// Load settings, modify them, and save them back
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut UserSettings) -> Result<()>,
    {
        let mut settings = Self::load(path)?;
        f(&mut settings)?;
        settings.save(path)?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProgressionKind;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");

        let mut settings = UserSettings::default();
        settings.auto_progression = true;
        settings
            .set_policy("bench_press", LoadProgression::linear(2.5))
            .unwrap();
        settings.save(&path).unwrap();

        let loaded = UserSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(
            loaded.policy_for("bench_press").map(|p| p.kind),
            Some(ProgressionKind::Linear)
        );
        assert!(loaded.policy_for("deadlift").is_none());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nonexistent.json");

        let settings = UserSettings::load(&path).unwrap();
        assert!(!settings.auto_progression);
        assert!(settings.policies.is_empty());
    }

    #[test]
    fn test_update_pattern() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");

        UserSettings::update(&path, |settings| {
            settings.auto_progression = true;
            Ok(())
        })
        .unwrap();

        let loaded = UserSettings::load(&path).unwrap();
        assert!(loaded.auto_progression);
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let mut settings = UserSettings::default();
        let result = settings.set_policy("squat", LoadProgression::rpe_based(4.0));
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(settings.policies.is_empty());
    }

    #[test]
    fn test_corrupted_settings_return_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("corrupted.json");

        std::fs::write(&path, "{ invalid json }").unwrap();

        let settings = UserSettings::load(&path).unwrap();
        assert_eq!(settings, UserSettings::default());
    }

    #[test]
    fn test_atomic_save() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");

        UserSettings::default().save(&path).unwrap();

        assert!(path.exists());
        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "settings.json")
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only settings.json, found extras: {:?}",
            extras
        );
    }
}
