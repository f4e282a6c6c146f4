// SleepWatch Companion: Settings Store
//
// Holds the last valid `Settings` and persists them as JSON so the alarm and
// light preferences survive restarts. Updates that fail validation are
// rejected and the previous settings stay in force.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::Settings;
use crate::error::PipelineError;
use crate::events::ConfigUpdate;

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    current: Settings,
}

impl SettingsStore {
    /// Store without a backing file.
    pub fn in_memory(settings: Settings) -> Result<Self, PipelineError> {
        settings.validate()?;
        Ok(Self {
            path: None,
            current: settings,
        })
    }

    /// Read settings from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let current = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading settings from {}", path.display()))?;
            let settings: Settings = serde_json::from_str(&raw)
                .with_context(|| format!("parsing settings in {}", path.display()))?;
            settings.validate()?;
            log::info!("Settings loaded from {}", path.display());
            settings
        } else {
            log::info!("No settings at {}, using defaults", path.display());
            Settings::default()
        };
        Ok(Self {
            path: Some(path),
            current,
        })
    }

    pub fn current(&self) -> &Settings {
        &self.current
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Validate and apply one update. On error nothing changes.
    pub fn apply(&mut self, update: ConfigUpdate) -> Result<&Settings, PipelineError> {
        let mut candidate = self.current;
        match update {
            ConfigUpdate::Alarm(alarm) => candidate.alarm = alarm,
            ConfigUpdate::Actuation(prefs) => candidate.actuation = prefs,
            ConfigUpdate::Replace(settings) => candidate = settings,
        }
        candidate.validate()?;
        self.current = candidate;
        Ok(&self.current)
    }

    /// Write the current settings back to the backing file, if any.
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.current)?;
        fs::write(path, json).with_context(|| format!("writing settings to {}", path.display()))?;
        Ok(())
    }
}
