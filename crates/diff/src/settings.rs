use crate::format::OutputFormat;
use crate::{DiffError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default run-directory prefix: one directory level per year, month and day.
pub const DEFAULT_FEED_PREFIX: &str = "%Y/%m/%d";

/// Default root for run files.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Extension of run files; the stem is the source name.
pub const FEED_EXTENSION: &str = "json";

/// Innermost run directory, appended below the prefix.
const RUN_LEAF_FORMAT: &str = "%H%M%S";

/// Date/time specifiers accepted in a prefix, most significant first.
const ORDERED_SPECIFIERS: [char; 6] = ['Y', 'm', 'd', 'H', 'M', 'S'];

/// Specifiers every prefix must carry so that days never share a run directory.
const REQUIRED_SPECIFIERS: usize = 3;

/// Raw diff settings as they come from a config file or the command line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DiffSettings {
    /// Root directory of all run files.
    pub output_dir: PathBuf,

    /// Output-format strategy selector. Only `"ocd"` is supported.
    pub output_format: Option<String>,

    /// strftime-style prefix for run directories (defaults to [`DEFAULT_FEED_PREFIX`]).
    pub feed_prefix: Option<String>,
}

impl Default for DiffSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_format: Some(OutputFormat::Ocd.as_str().to_string()),
            feed_prefix: None,
        }
    }
}

impl DiffSettings {
    /// Resolve every setting the diff path needs, failing fast on anything unusable.
    pub fn validate(&self) -> Result<DiffConfig> {
        let format = OutputFormat::from_setting(self.output_format.as_deref())?;
        let template = match self.feed_prefix.as_deref() {
            Some(prefix) => FeedTemplate::parse(prefix)?,
            None => FeedTemplate::default(),
        };
        if self.output_dir.as_os_str().is_empty() {
            return Err(DiffError::config("output_dir must not be empty"));
        }

        Ok(DiffConfig {
            output_dir: self.output_dir.clone(),
            format,
            template,
        })
    }
}

/// Validated settings. Only obtainable through [`DiffSettings::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffConfig {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub template: FeedTemplate,
}

/// Path template for run directories.
///
/// String order of the produced paths equals chronological order: the prefix may only use
/// zero-padded specifiers in decreasing significance, starting with year, month and day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTemplate {
    prefix: String,
}

impl Default for FeedTemplate {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_FEED_PREFIX.to_string(),
        }
    }
}

impl FeedTemplate {
    pub fn parse(prefix: &str) -> Result<Self> {
        let prefix = prefix.trim();
        if prefix.starts_with('/') || prefix.starts_with('\\') {
            return Err(DiffError::config(format!(
                "feed prefix '{prefix}' must be relative to the output directory"
            )));
        }
        if prefix.split(['/', '\\']).any(|part| part == "..") {
            return Err(DiffError::config(format!(
                "feed prefix '{prefix}' must not contain '..'"
            )));
        }

        let mut seen = Vec::new();
        let mut chars = prefix.chars();
        while let Some(ch) = chars.next() {
            if ch != '%' {
                continue;
            }
            let Some(spec) = chars.next() else {
                return Err(DiffError::config(format!(
                    "feed prefix '{prefix}' ends with a dangling '%'"
                )));
            };
            if !ORDERED_SPECIFIERS.contains(&spec) {
                return Err(DiffError::config(format!(
                    "feed prefix '{prefix}' uses unsupported specifier '%{spec}' \
                     (allowed: %Y %m %d %H %M %S)"
                )));
            }
            seen.push(spec);
        }

        let in_order = seen.len() <= ORDERED_SPECIFIERS.len()
            && seen.iter().zip(ORDERED_SPECIFIERS.iter()).all(|(a, b)| a == b);
        if !in_order || seen.len() < REQUIRED_SPECIFIERS {
            return Err(DiffError::config(format!(
                "feed prefix '{prefix}' must list %Y, %m, %d (then optionally %H, %M, %S) in that \
                 order so that run paths sort chronologically"
            )));
        }

        Ok(Self {
            prefix: prefix.to_string(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Directory of the run started at `started_at`.
    pub fn run_dir(&self, root: &Path, started_at: NaiveDateTime) -> PathBuf {
        root.join(started_at.format(&self.prefix).to_string())
            .join(started_at.format(RUN_LEAF_FORMAT).to_string())
    }

    /// Run file of `source_name` for the run started at `started_at`.
    pub fn run_file(&self, root: &Path, started_at: NaiveDateTime, source_name: &str) -> PathBuf {
        self.run_dir(root, started_at)
            .join(format!("{source_name}.{FEED_EXTENSION}"))
    }
}
