//! Persisted prompt settings.
//!
//! The toggles the prompt exposes are written back to a JSON file in the
//! user configuration directory whenever one changes, so a session picks
//! up where the last one left off.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Toggles and overrides the prompt keeps between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Restrict destination candidates to the source store's account family.
    pub filter_destinations_by_account: bool,
    /// Count matches without relocating anything.
    pub dry_run: bool,
    /// Explicit target year overriding the destination store's name.
    pub override_year: Option<i32>,
    /// Allow the provision command to create missing yearly archives.
    pub create_missing_archives: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            filter_destinations_by_account: true,
            dry_run: true,
            override_year: None,
            create_missing_archives: false,
        }
    }
}

impl Settings {
    /// Loads settings from the user configuration directory.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&settings_path())
    }

    /// Saves settings to the user configuration directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory or file cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&settings_path())
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing settings in {}", path.display()))
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self).context("serializing settings")?;
        fs::write(path, contents).with_context(|| format!("writing settings to {}", path.display()))
    }
}

fn settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailattic")
        .join("settings.json")
}
