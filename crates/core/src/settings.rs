//! User settings persistence.
//!
//! Preferences that outlive one invocation: which image model to call, where
//! downloads land, how many candidates each generation fans out to, and
//! whether selection changes regenerate automatically.

use crate::error::Result;
use crate::orchestrator::GenerationPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Image-capable Gemini models offered by `settings --model`.
pub const AVAILABLE_MODELS: &[&str] = &[
    "gemini-2.5-flash-image",
    "gemini-2.5-flash-image-preview",
];

pub const MAX_CANDIDATES: usize = 4;

/// User-configurable settings persisted between sessions.
///
/// Settings are stored as JSON in the user's config directory
/// (e.g., `~/.config/ai-styler/settings.json` on Linux).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Model override; `None` keeps whatever the environment selects.
    pub model: Option<String>,
    /// Where downloads are written. Defaults to the working directory.
    pub output_dir: Option<PathBuf>,
    /// Parallel calls per generation, 1 to [`MAX_CANDIDATES`].
    pub candidates: usize,
    pub auto_regenerate: bool,
}

impl Settings {
    /// Returns the path to the settings file.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ai-styler").map(|dirs| {
            let config_dir = dirs.config_dir();
            if !config_dir.exists() {
                let _ = fs::create_dir_all(config_dir);
            }
            config_dir.join("settings.json")
        })
    }

    /// Loads settings from the user's config directory, falling back to
    /// defaults if the file is missing or unreadable.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        let settings: Self = fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        settings.normalized()
    }

    /// Persists settings to the user's config directory.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.clone().normalized())?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Clamps the candidate count into range.
    pub fn normalized(mut self) -> Self {
        self.candidates = self.candidates.clamp(1, MAX_CANDIDATES);
        self
    }

    /// Fan-out policy for the orchestrator, keeping the default retry schedule.
    pub fn policy(&self) -> GenerationPolicy {
        GenerationPolicy {
            candidates: self.candidates.clamp(1, MAX_CANDIDATES),
            ..GenerationPolicy::default()
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: None,
            output_dir: None,
            candidates: MAX_CANDIDATES,
            auto_regenerate: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.policy().candidates, 4);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            model: Some("gemini-2.5-flash-image-preview".into()),
            output_dir: Some(PathBuf::from("/tmp/out")),
            candidates: 2,
            auto_regenerate: true,
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn out_of_range_candidates_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"candidates": 9}"#).unwrap();
        let settings = Settings::load_from(&path);
        assert_eq!(settings.candidates, 4);
        assert!(!settings.auto_regenerate);

        let zero = Settings { candidates: 0, ..Settings::default() };
        assert_eq!(zero.policy().candidates, 1);
    }

    #[test]
    fn garbage_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }
}
