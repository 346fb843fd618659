use anyhow::{Context, Result};
use civic_diff::DiffSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Contents of the optional `--config` TOML file.
///
/// ```toml
/// [diff]
/// output_dir = "output"
/// output_format = "ocd"
/// feed_prefix = "%Y/%m/%d"
///
/// [google]
/// api_key = "..."
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub diff: DiffSettings,
    pub google: GoogleSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GoogleSettings {
    pub api_key: Option<String>,
    /// Calendar API root, for mirrors and local replays.
    pub calendar_api: Option<String>,
}

impl FileConfig {
    /// Built-in defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output_dir: Option<PathBuf>,
    pub output_format: Option<String>,
    pub feed_prefix: Option<String>,
    pub google_api_key: Option<String>,
}

impl FileConfig {
    pub fn diff_settings(&self, overrides: &Overrides) -> DiffSettings {
        let mut settings = self.diff.clone();
        if let Some(dir) = &overrides.output_dir {
            settings.output_dir = dir.clone();
        }
        if let Some(format) = &overrides.output_format {
            settings.output_format = Some(format.clone());
        }
        if let Some(prefix) = &overrides.feed_prefix {
            settings.feed_prefix = Some(prefix.clone());
        }
        settings
    }

    /// Flag, then config file, then `GOOGLE_API_KEY`.
    pub fn google_api_key(&self, overrides: &Overrides) -> Option<String> {
        overrides
            .google_api_key
            .clone()
            .or_else(|| self.google.api_key.clone())
            .or_else(|| std::env::var(GOOGLE_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }
}
