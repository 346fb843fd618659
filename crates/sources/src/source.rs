use crate::transport::Transport;
use crate::{monroeville, mt_lebanon, Result, SourceError};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use civic_record::{NormalizedRecord, SourceInfo};

/// A producer of normalized meeting records, one batch at a time.
#[async_trait]
pub trait MeetingSource: Send {
    fn info(&self) -> &SourceInfo;

    /// Next batch of records, or `None` once the source is exhausted.
    async fn next_batch(
        &mut self,
        transport: &dyn Transport,
    ) -> Result<Option<Vec<NormalizedRecord>>>;
}

/// Run-wide inputs for building sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOptions {
    pub google_api_key: Option<String>,

    /// Run clock as local wall time. Drives status assignment.
    pub now: NaiveDateTime,

    /// Run clock in UTC. Anchors query windows.
    pub now_utc: NaiveDateTime,

    /// Override for the Google Calendar API root.
    pub calendar_api: Option<String>,
}

impl SourceOptions {
    pub fn at(now: NaiveDateTime, now_utc: NaiveDateTime) -> Self {
        Self {
            google_api_key: None,
            now,
            now_utc,
            calendar_api: None,
        }
    }

    pub fn current() -> Self {
        let now = Local::now();
        Self::at(now.naive_local(), now.naive_utc())
    }

    #[must_use]
    pub fn with_google_api_key(mut self, key: Option<String>) -> Self {
        self.google_api_key = key;
        self
    }

    #[must_use]
    pub fn with_calendar_api(mut self, base_url: Option<String>) -> Self {
        self.calendar_api = base_url;
        self
    }
}

const SOURCE_NAMES: &[&str] = &[monroeville::NAME, mt_lebanon::NAME];

/// Names accepted by [`build_source`], sorted.
pub fn source_names() -> &'static [&'static str] {
    SOURCE_NAMES
}

pub fn build_source(name: &str, options: &SourceOptions) -> Result<Box<dyn MeetingSource>> {
    match name {
        monroeville::NAME => Ok(Box::new(monroeville::monroeville(options)?)),
        mt_lebanon::NAME => Ok(Box::new(mt_lebanon::MtLebanon::new())),
        other => Err(SourceError::UnknownSource(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn registry_builds_every_listed_source() {
        let options = SourceOptions::current().with_google_api_key(Some("key".to_string()));
        for name in source_names() {
            let source = build_source(name, &options).unwrap();
            assert_eq!(source.info().name, *name);
        }
    }

    #[test]
    fn names_are_sorted() {
        let mut sorted = source_names().to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, source_names());
    }

    #[test]
    fn unknown_source_is_rejected() {
        let err = build_source("pittsburgh_city_council", &SourceOptions::current())
            .err()
            .expect("unknown source");
        assert!(matches!(err, SourceError::UnknownSource(name) if name == "pittsburgh_city_council"));
    }
}
