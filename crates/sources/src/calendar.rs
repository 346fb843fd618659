//! Google Calendar `events.list` client.
//!
//! A [`CalendarPager`] walks the paginated listing one page at a time; [`event_to_record`] turns
//! one listed event into a [`NormalizedRecord`]. Concrete calendars live in their own modules and
//! only choose the calendar id and query window.

use crate::source::MeetingSource;
use crate::transport::Transport;
use crate::{Result, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use civic_record::{Classification, Location, NormalizedRecord, SourceInfo};
use reqwest::Url;
use serde::Deserialize;

pub const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const LOCAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarPage {
    #[serde(default)]
    pub items: Vec<CalendarEvent>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub html_link: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
}

/// Either a timed instant (`dateTime`) or a whole day (`date`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
}

impl EventTime {
    /// Local wall-clock time; the UTC offset is dropped, a bare date becomes midnight.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        if let Some(date_time) = self.date_time.as_deref() {
            return DateTime::parse_from_rfc3339(date_time)
                .map(|parsed| parsed.naive_local())
                .ok()
                .or_else(|| NaiveDateTime::parse_from_str(date_time, LOCAL_TIME_FORMAT).ok());
        }
        NaiveDate::parse_from_str(self.date.as_deref()?, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)
    }

    pub fn is_whole_day(&self) -> bool {
        self.date.is_some() && self.date_time.is_none()
    }
}

/// Parameters forwarded verbatim to `events.list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarQuery {
    pub single_events: bool,
    pub time_zone: String,
    pub max_attendees: u32,
    pub time_min: NaiveDateTime,
    pub time_max: NaiveDateTime,
}

impl CalendarQuery {
    /// Expanded single events within `window` either side of `now_utc`.
    pub fn around(now_utc: NaiveDateTime, window: Duration, time_zone: impl Into<String>) -> Self {
        Self {
            single_events: true,
            time_zone: time_zone.into(),
            max_attendees: 1,
            time_min: now_utc - window,
            time_max: now_utc + window,
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("singleEvents", self.single_events.to_string()),
            ("timeZone", self.time_zone.clone()),
            ("maxAttendees", self.max_attendees.to_string()),
            ("timeMin", self.time_min.format(QUERY_TIME_FORMAT).to_string()),
            ("timeMax", self.time_max.format(QUERY_TIME_FORMAT).to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PageState {
    First,
    Next(String),
    Done,
}

/// Lazily follows `nextPageToken` until the listing is exhausted.
#[derive(Debug, Clone)]
pub struct CalendarPager {
    base_url: String,
    calendar_id: String,
    api_key: String,
    query: CalendarQuery,
    state: PageState,
}

impl CalendarPager {
    pub fn new(
        calendar_id: impl Into<String>,
        api_key: impl Into<String>,
        query: CalendarQuery,
    ) -> Self {
        Self {
            base_url: GOOGLE_CALENDAR_API.to_string(),
            calendar_id: calendar_id.into(),
            api_key: api_key.into(),
            query,
            state: PageState::First,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn query(&self) -> &CalendarQuery {
        &self.query
    }

    pub fn is_done(&self) -> bool {
        self.state == PageState::Done
    }

    /// `{base}/calendars/{calendar_id}/events?key=..[&pageToken=..]&<query>`
    pub fn page_url(&self, page_token: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SourceError::Url(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| SourceError::Url(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"]);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("key", &self.api_key);
            if let Some(token) = page_token {
                pairs.append_pair("pageToken", token);
            }
            for (name, value) in self.query.params() {
                pairs.append_pair(name, &value);
            }
        }
        Ok(url)
    }

    /// Fetch the next page, or `None` once the previous page carried no continuation token.
    pub async fn next_page(&mut self, transport: &dyn Transport) -> Result<Option<CalendarPage>> {
        let token = match &self.state {
            PageState::Done => return Ok(None),
            PageState::First => None,
            PageState::Next(token) => Some(token.clone()),
        };
        let url = self.page_url(token.as_deref())?;
        let body = transport.get_text(url.as_str()).await?;
        let page: CalendarPage = serde_json::from_str(&body)?;

        match page.next_page_token.as_deref().filter(|t| !t.is_empty()) {
            Some(next) => {
                log::info!("Processing the next page of Google calendar events");
                self.state = PageState::Next(next.to_string());
            }
            None => {
                log::info!("No more pages");
                self.state = PageState::Done;
            }
        }
        Ok(Some(page))
    }
}

/// Convert one listed event. Events without a usable start are skipped.
pub fn event_to_record(
    event: &CalendarEvent,
    source_name: &str,
    now: NaiveDateTime,
) -> Option<NormalizedRecord> {
    let Some(start) = event.start.as_ref().and_then(EventTime::to_naive) else {
        log::warn!(
            "{source_name}: skipping calendar event {} without a usable start",
            event.id.as_deref().unwrap_or("<no id>")
        );
        return None;
    };

    let mut record =
        NormalizedRecord::new(source_name, event.summary.clone().unwrap_or_default(), start);
    record.description = event.description.clone().unwrap_or_default();
    record.classification = Classification::NotClassified;
    record.end = event.end.as_ref().and_then(EventTime::to_naive);
    record.all_day = event.start.as_ref().is_some_and(EventTime::is_whole_day);
    record.location = Location {
        address: event.location.clone().unwrap_or_default(),
        name: String::new(),
    };
    record.source_url = event.html_link.clone().unwrap_or_default();
    record.assign_status(now, event.status.as_deref().unwrap_or_default());
    Some(record)
}

/// A calendar-backed source: one batch per listing page.
pub struct CalendarSource {
    info: SourceInfo,
    pager: CalendarPager,
    now: NaiveDateTime,
}

impl CalendarSource {
    pub fn new(info: SourceInfo, pager: CalendarPager, now: NaiveDateTime) -> Self {
        Self { info, pager, now }
    }

    pub fn pager(&self) -> &CalendarPager {
        &self.pager
    }
}

#[async_trait]
impl MeetingSource for CalendarSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    async fn next_batch(
        &mut self,
        transport: &dyn Transport,
    ) -> Result<Option<Vec<NormalizedRecord>>> {
        let Some(page) = self.pager.next_page(transport).await? else {
            return Ok(None);
        };
        let records = page
            .items
            .iter()
            .filter_map(|event| event_to_record(event, &self.info.name, self.now))
            .collect();
        Ok(Some(records))
    }
}
