use crate::identity::identity;
use crate::status::{meeting_status, Status};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Static description of a meeting source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Logical source name; also the run file stem (`<name>.json`).
    pub name: String,
    pub agency: String,
    /// IANA timezone the source publishes local times in.
    pub timezone: String,
}

impl SourceInfo {
    pub fn new(
        name: impl Into<String>,
        agency: impl Into<String>,
        timezone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            agency: agency.into(),
            timezone: timezone.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Classification {
    #[serde(rename = "Advisory Committee")]
    AdvisoryCommittee,
    Board,
    #[serde(rename = "City Council")]
    CityCouncil,
    Commission,
    Committee,
    Forum,
    #[serde(rename = "Police Beat")]
    PoliceBeat,
    #[default]
    #[serde(rename = "Not classified")]
    NotClassified,
}

impl Classification {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::AdvisoryCommittee => "Advisory Committee",
            Classification::Board => "Board",
            Classification::CityCouncil => "City Council",
            Classification::Commission => "Commission",
            Classification::Committee => "Committee",
            Classification::Forum => "Forum",
            Classification::PoliceBeat => "Police Beat",
            Classification::NotClassified => "Not classified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Location {
    pub address: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub title: String,
}

/// A meeting after source-specific extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub source_name: String,
    pub title: String,
    pub description: String,
    pub classification: Classification,
    /// Naive local wall-clock time in the source's timezone.
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
    pub all_day: bool,
    pub time_notes: String,
    pub location: Location,
    pub links: Vec<Link>,
    pub source_url: String,
    pub status: Status,
    /// Deduplication key, see [`crate::identity`].
    pub identity: String,
}

impl NormalizedRecord {
    /// Create a record with a provisional identity derived from `start` and `title`.
    pub fn new(
        source_name: impl Into<String>,
        title: impl Into<String>,
        start: NaiveDateTime,
    ) -> Self {
        let mut record = Self {
            source_name: source_name.into(),
            title: title.into(),
            description: String::new(),
            classification: Classification::default(),
            start,
            end: None,
            all_day: false,
            time_notes: String::new(),
            location: Location::default(),
            links: Vec::new(),
            source_url: String::new(),
            status: Status::Tentative,
            identity: String::new(),
        };
        record.assign_identity();
        record
    }

    /// Recompute the identity after extractors changed title or start.
    pub fn assign_identity(&mut self) -> &str {
        self.identity = identity(&self.source_name, self.start, &self.title);
        &self.identity
    }

    pub fn assign_status(&mut self, now: NaiveDateTime, extra_text: &str) -> Status {
        self.status = meeting_status(self, now, extra_text);
        self.status
    }
}
