use crate::calendar::{CalendarPager, CalendarQuery, CalendarSource};
use crate::source::SourceOptions;
use crate::{Result, SourceError};
use chrono::Duration;
use civic_record::SourceInfo;

pub const NAME: &str = "monroeville_public_meetings";
pub const AGENCY: &str = "Municipality of Monroeville";
pub const TIMEZONE: &str = "America/New_York";

/// Public Google Calendar behind https://www.monroeville.pa.us/calendar.htm
pub const CALENDAR_ID: &str = "municipalityofmonroeville@gmail.com";

/// Days listed either side of the run clock.
pub const WINDOW_DAYS: i64 = 180;

/// Build the Monroeville calendar source. Fails without a Google API key.
pub fn monroeville(options: &SourceOptions) -> Result<CalendarSource> {
    let api_key = options
        .google_api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| SourceError::MissingApiKey {
            source_name: NAME.to_string(),
        })?;

    let query = CalendarQuery::around(options.now_utc, Duration::days(WINDOW_DAYS), TIMEZONE);
    let mut pager = CalendarPager::new(CALENDAR_ID, api_key, query);
    if let Some(base_url) = &options.calendar_api {
        pager = pager.with_base_url(base_url.clone());
    }

    Ok(CalendarSource::new(
        SourceInfo::new(NAME, AGENCY, TIMEZONE),
        pager,
        options.now,
    ))
}
