use crate::engine::DiffedRecord;
use crate::ocd::{self, OcdEvent};
use crate::{DiffError, Result};
use chrono::NaiveDateTime;
use civic_record::{SourceInfo, Status};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output-format strategy. Decides how run files are written and how prior runs are read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Open-Civic-Data-like events, see [`crate::ocd`].
    Ocd,
}

impl OutputFormat {
    pub const SUPPORTED: &'static [&'static str] = &["ocd"];

    pub fn from_setting(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) if name.eq_ignore_ascii_case("ocd") => Ok(OutputFormat::Ocd),
            Some(other) => Err(DiffError::config(format!(
                "unsupported output format '{other}' (supported: {})",
                Self::SUPPORTED.join(", ")
            ))),
            None => Err(DiffError::config(format!(
                "an output format must be enabled for diffing (supported: {})",
                Self::SUPPORTED.join(", ")
            ))),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Ocd => "ocd",
        }
    }

    /// Identity a prior run assigned to `previous`, if it was tagged with one.
    pub fn previous_identity<'a>(&self, previous: &'a Value) -> Option<&'a str> {
        match self {
            OutputFormat::Ocd => ocd::previous_identity(previous),
        }
    }

    pub fn previous_storage_id(&self, previous: &Value) -> Option<String> {
        match self {
            OutputFormat::Ocd => ocd::previous_storage_id(previous),
        }
    }

    pub fn previous_start(&self, previous: &Value) -> Option<NaiveDateTime> {
        match self {
            OutputFormat::Ocd => ocd::previous_start(previous),
        }
    }

    pub fn mark_status(&self, previous: &mut Value, status: Status) {
        match self {
            OutputFormat::Ocd => ocd::mark_status(previous, status),
        }
    }

    /// Render one diffed record as a run-file line, assigning a storage id to new records.
    pub fn render(
        &self,
        diffed: &DiffedRecord,
        info: &SourceInfo,
        updated_at: NaiveDateTime,
    ) -> Result<Value> {
        match self {
            OutputFormat::Ocd => Ok(serde_json::to_value(OcdEvent::from_diffed(
                diffed, info, updated_at,
            ))?),
        }
    }
}
