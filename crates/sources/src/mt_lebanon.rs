use crate::html::{blocks, Block};
use crate::source::MeetingSource;
use crate::transport::Transport;
use crate::{Result, SourceError};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use civic_record::{Classification, Link, Location, NormalizedRecord, SourceInfo, Status};
use once_cell::sync::Lazy;
use regex::Regex;

pub const NAME: &str = "pa_mt_lebanon";
pub const AGENCY: &str = "Mt Lebanon Commission";
pub const TIMEZONE: &str = "America/New_York";
pub const SCHEDULE_URL: &str = "http://mtlebanon.org/299/Commission-Meetings";

const TITLE: &str = "Mt Lebanon Commission Meeting";
const LOCATION_NAME: &str = "Municipal Building";
const ADDRESS: &str = "710 Washington Road, Pittsburgh, PA 15228";

/// Marks special sessions in the schedule table; those are not regular meetings.
const SPECIAL_EVENT_MARKER: &str = "**";

static MONTH_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})\b")
        .expect("valid month/day regex")
});

static SCHEDULE_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(20\d\d)\s+meeting\s+schedule").expect("valid schedule year regex")
});

static MEETING_HOUR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*([ap])\.\s*m\.").expect("valid meeting hour regex")
});

/// Mt. Lebanon's commission schedule page: a single fetch, a single batch.
pub struct MtLebanon {
    info: SourceInfo,
    url: String,
    fetched: bool,
}

impl MtLebanon {
    pub fn new() -> Self {
        Self {
            info: SourceInfo::new(NAME, AGENCY, TIMEZONE),
            url: SCHEDULE_URL.to_string(),
            fetched: false,
        }
    }
}

impl Default for MtLebanon {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MeetingSource for MtLebanon {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    async fn next_batch(
        &mut self,
        transport: &dyn Transport,
    ) -> Result<Option<Vec<NormalizedRecord>>> {
        if self.fetched {
            return Ok(None);
        }
        self.fetched = true;

        let body = transport.get_text(&self.url).await?;
        let records = parse_schedule(&body, &self.url)?;
        log::info!("{NAME}: {} meetings on the schedule page", records.len());
        Ok(Some(records))
    }
}

/// Extract every regular meeting from the schedule page.
///
/// The page states the year in a "<year> Meeting Schedule" heading and the start time in the
/// first bullet under the "... Meetings" heading; table cells only carry month and day.
pub fn parse_schedule(html: &str, source_url: &str) -> Result<Vec<NormalizedRecord>> {
    let headings = blocks(html, "h2", 0);
    let year = schedule_year(&headings)?;
    let hour = meeting_hour(html, &headings)?;

    let mut records = Vec::new();
    for body in blocks(html, "tbody", 0) {
        for cell in blocks(body.inner, "td", 0) {
            let text = cell.text();
            let Some(caps) = MONTH_DAY_RE.captures(&text) else {
                continue;
            };
            if text.contains(SPECIAL_EVENT_MARKER) {
                log::debug!("{NAME}: skipping special session '{text}'");
                continue;
            }
            let Some(start) = cell_start(year, &caps[1], &caps[2], hour) else {
                log::warn!("{NAME}: '{text}' is not a date in {year}");
                continue;
            };
            records.push(meeting(start, source_url));
        }
    }
    Ok(records)
}

fn schedule_year(headings: &[Block<'_>]) -> Result<i32> {
    headings
        .iter()
        .find_map(|h2| {
            SCHEDULE_YEAR_RE
                .captures(&h2.text())
                .and_then(|caps| caps[1].parse().ok())
        })
        .ok_or_else(|| SourceError::Parse("no '<year> Meeting Schedule' heading".to_string()))
}

fn meeting_hour(html: &str, headings: &[Block<'_>]) -> Result<u32> {
    let heading = headings
        .iter()
        .find(|h2| h2.text().contains("Meetings"))
        .ok_or_else(|| SourceError::Parse("no meeting times heading".to_string()))?;
    let bullet = blocks(html, "li", heading.end)
        .into_iter()
        .next()
        .map(|li| li.text())
        .ok_or_else(|| SourceError::Parse("no meeting time bullet".to_string()))?;
    let caps = MEETING_HOUR_RE
        .captures(&bullet)
        .ok_or_else(|| SourceError::Parse(format!("no meeting time in '{bullet}'")))?;

    let hour: u32 = caps[1]
        .parse()
        .map_err(|_| SourceError::Parse(format!("bad hour in '{bullet}'")))?;
    if !(1..=12).contains(&hour) {
        return Err(SourceError::Parse(format!("bad hour in '{bullet}'")));
    }
    let afternoon = caps[2].eq_ignore_ascii_case("p");
    Ok(match (hour, afternoon) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    })
}

fn cell_start(year: i32, month: &str, day: &str, hour: u32) -> Option<NaiveDateTime> {
    let month = match month.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day.parse().ok()?)?.and_hms_opt(hour, 0, 0)
}

fn meeting(start: NaiveDateTime, source_url: &str) -> NormalizedRecord {
    let mut record = NormalizedRecord::new(NAME, TITLE, start);
    record.classification = Classification::Commission;
    record.location = Location {
        address: ADDRESS.to_string(),
        name: LOCATION_NAME.to_string(),
    };
    record.links = vec![Link {
        href: SCHEDULE_URL.to_string(),
        title: TITLE.to_string(),
    }];
    record.source_url = source_url.to_string();
    record.status = Status::Tentative;
    record
}
