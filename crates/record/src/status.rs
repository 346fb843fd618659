use crate::record::NormalizedRecord;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

const CANCELLATION_MARKERS: &[&str] = &["cancel", "rescheduled", "postpone"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Cancelled,
    Tentative,
    Confirmed,
    Passed,
}

impl Status {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Cancelled => "cancelled",
            Status::Tentative => "tentative",
            Status::Confirmed => "confirmed",
            Status::Passed => "passed",
        }
    }
}

/// Lifecycle status relative to `now`.
///
/// Cancellation wording in the title, description or `extra_text` wins over timing.
#[must_use]
pub fn meeting_status(record: &NormalizedRecord, now: NaiveDateTime, extra_text: &str) -> Status {
    let text = format!("{} {} {}", record.title, record.description, extra_text).to_lowercase();
    if CANCELLATION_MARKERS
        .iter()
        .any(|marker| text.contains(marker))
    {
        return Status::Cancelled;
    }
    if record.start < now {
        return Status::Passed;
    }
    Status::Tentative
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(19, 0, 0))
            .expect("valid datetime")
    }

    #[test]
    fn past_meeting_is_passed() {
        let record = NormalizedRecord::new("s", "Board", at(2020, 5, 20));
        assert_eq!(meeting_status(&record, at(2020, 10, 18), ""), Status::Passed);
    }

    #[test]
    fn upcoming_meeting_is_tentative() {
        let record = NormalizedRecord::new("s", "Board", at(2020, 10, 21));
        assert_eq!(meeting_status(&record, at(2020, 10, 18), ""), Status::Tentative);
    }

    #[test]
    fn cancellation_wording_wins() {
        let mut record = NormalizedRecord::new("s", "Board", at(2020, 10, 21));
        record.description = "This meeting has been POSTPONED".to_string();
        assert_eq!(meeting_status(&record, at(2020, 10, 18), ""), Status::Cancelled);

        let record = NormalizedRecord::new("s", "Board", at(2020, 10, 21));
        assert_eq!(
            meeting_status(&record, at(2020, 10, 18), "Cancelled due to weather"),
            Status::Cancelled
        );
    }
}
