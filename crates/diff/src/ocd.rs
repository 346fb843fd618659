//! Open-Civic-Data-like event documents.
//!
//! This is the on-disk shape of every line of a run file, and the shape prior runs are read back
//! in. Reads go through `serde_json::Value` so partially tagged legacy lines still load.

use crate::engine::DiffedRecord;
use chrono::NaiveDateTime;
use civic_record::{NormalizedRecord, SourceInfo, Status};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

pub const OCD_EVENT_TYPE: &str = "event";
pub const OCD_ID_PREFIX: &str = "ocd-event/";
pub const STORAGE_ID_KEY: &str = "_id";
pub const IDENTITY_KEY: &str = "cityscrapers.org/id";
pub const AGENCY_KEY: &str = "cityscrapers.org/agency";
pub const TIME_NOTES_KEY: &str = "cityscrapers.org/time_notes";
pub const ADDRESS_KEY: &str = "cityscrapers.org/address";

/// Accepted spellings of the extras object, primary first.
pub const EXTRAS_KEYS: [&str; 2] = ["extras", "extra"];

const OCD_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcdEvent {
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(rename = "_id")]
    pub id: String,
    pub updated_at: String,
    pub name: String,
    pub description: String,
    pub classification: String,
    pub status: String,
    pub all_day: bool,
    pub start_time: String,
    pub end_time: Option<String>,
    pub timezone: String,
    pub location: OcdLocation,
    pub documents: Vec<OcdLink>,
    pub links: Vec<OcdLink>,
    pub sources: Vec<OcdLink>,
    pub participants: Vec<OcdParticipant>,
    pub extras: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcdLocation {
    pub url: String,
    pub name: String,
    pub coordinates: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcdLink {
    pub url: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcdParticipant {
    pub note: String,
    pub name: String,
    pub entity_type: String,
    pub entity_name: String,
    pub entity_id: String,
}

impl OcdEvent {
    pub fn from_diffed(
        diffed: &DiffedRecord,
        info: &SourceInfo,
        updated_at: NaiveDateTime,
    ) -> Self {
        let id = diffed.storage_id.clone().unwrap_or_else(new_storage_id);
        Self::from_record(&diffed.record, id, info, updated_at)
    }

    pub fn from_record(
        record: &NormalizedRecord,
        id: String,
        info: &SourceInfo,
        updated_at: NaiveDateTime,
    ) -> Self {
        let mut extras = BTreeMap::new();
        extras.insert(IDENTITY_KEY.to_string(), Value::from(record.identity.clone()));
        extras.insert(AGENCY_KEY.to_string(), Value::from(info.agency.clone()));
        extras.insert(TIME_NOTES_KEY.to_string(), Value::from(record.time_notes.clone()));
        extras.insert(
            ADDRESS_KEY.to_string(),
            Value::from(record.location.address.clone()),
        );

        Self {
            kind: OCD_EVENT_TYPE.to_string(),
            id,
            updated_at: updated_at.format(OCD_TIME_FORMAT).to_string(),
            name: record.title.clone(),
            description: record.description.clone(),
            classification: record.classification.as_str().to_string(),
            status: record.status.as_str().to_string(),
            all_day: record.all_day,
            start_time: record.start.format(OCD_TIME_FORMAT).to_string(),
            end_time: record.end.map(|end| end.format(OCD_TIME_FORMAT).to_string()),
            timezone: info.timezone.clone(),
            location: OcdLocation {
                url: String::new(),
                name: record.location.name.clone(),
                coordinates: None,
            },
            documents: Vec::new(),
            links: record
                .links
                .iter()
                .map(|link| OcdLink {
                    url: link.href.clone(),
                    note: link.title.clone(),
                })
                .collect(),
            sources: vec![OcdLink {
                url: record.source_url.clone(),
                note: String::new(),
            }],
            participants: vec![OcdParticipant {
                note: "host".to_string(),
                name: info.agency.clone(),
                entity_type: "organization".to_string(),
                entity_name: info.agency.clone(),
                entity_id: String::new(),
            }],
            extras,
        }
    }
}

/// Fresh storage id for a record the sink has never seen.
#[must_use]
pub fn new_storage_id() -> String {
    format!("{OCD_ID_PREFIX}{}", Uuid::new_v4())
}

/// Identity of a persisted event, read from `extras` or, for legacy lines, `extra`.
pub fn previous_identity(event: &Value) -> Option<&str> {
    let extras = EXTRAS_KEYS
        .iter()
        .filter_map(|key| event.get(*key))
        .find(|value| value.as_object().is_some_and(|obj| !obj.is_empty()))?;
    extras.get(IDENTITY_KEY)?.as_str()
}

/// Storage id of a persisted event. Numeric ids are kept as their decimal text.
pub fn previous_storage_id(event: &Value) -> Option<String> {
    match event.get(STORAGE_ID_KEY)? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

pub fn previous_start(event: &Value) -> Option<NaiveDateTime> {
    event.get("start_time")?.as_str()?.parse().ok()
}

pub fn mark_status(event: &mut Value, status: Status) {
    if let Some(obj) = event.as_object_mut() {
        obj.insert("status".to_string(), Value::from(status.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use civic_record::{Classification, Link, Location};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, 0))
            .expect("valid datetime")
    }

    #[test]
    fn renders_event_with_extras() {
        let mut record = NormalizedRecord::new(
            "pa_mt_lebanon",
            "Mt Lebanon Commission Meeting",
            at(2020, 1, 6, 20, 0),
        );
        record.classification = Classification::Commission;
        record.location = Location {
            address: "710 Washington Road".to_string(),
            name: "Municipal Building".to_string(),
        };
        record.links.push(Link {
            href: "http://example.org/meetings".to_string(),
            title: "Agenda".to_string(),
        });
        record.source_url = "http://example.org/meetings".to_string();
        let info = SourceInfo::new("pa_mt_lebanon", "Mt Lebanon Commission", "America/New_York");

        let event = OcdEvent::from_record(
            &record,
            "ocd-event/fixed".to_string(),
            &info,
            at(2020, 11, 7, 12, 0),
        );
        let value = serde_json::to_value(&event).expect("serialize");

        assert_eq!(value["_type"], json!("event"));
        assert_eq!(value["_id"], json!("ocd-event/fixed"));
        assert_eq!(value["start_time"], json!("2020-01-06T20:00:00"));
        assert_eq!(value["end_time"], Value::Null);
        assert_eq!(value["classification"], json!("Commission"));
        assert_eq!(value["status"], json!("tentative"));
        assert_eq!(
            value["links"],
            json!([{"url": "http://example.org/meetings", "note": "Agenda"}])
        );
        assert_eq!(
            previous_identity(&value),
            Some("pa_mt_lebanon/202001062000/x/mt_lebanon_commission_meeting")
        );
        assert_eq!(previous_storage_id(&value).as_deref(), Some("ocd-event/fixed"));
        assert_eq!(previous_start(&value), Some(at(2020, 1, 6, 20, 0)));
    }

    #[test]
    fn identity_falls_back_to_legacy_extra_key() {
        let legacy = json!({"_id": "a", "extra": {"cityscrapers.org/id": "s/1/x/t"}});
        assert_eq!(previous_identity(&legacy), Some("s/1/x/t"));

        let empty_primary = json!({
            "_id": "a",
            "extras": {},
            "extra": {"cityscrapers.org/id": "s/2/x/t"}
        });
        assert_eq!(previous_identity(&empty_primary), Some("s/2/x/t"));

        let primary_wins = json!({
            "extras": {"cityscrapers.org/id": "primary"},
            "extra": {"cityscrapers.org/id": "legacy"}
        });
        assert_eq!(previous_identity(&primary_wins), Some("primary"));
    }

    #[test]
    fn untagged_events_have_no_identity() {
        assert_eq!(previous_identity(&json!({"_id": "a"})), None);
        assert_eq!(previous_identity(&json!({"extras": {"other": 1}})), None);
        assert_eq!(previous_identity(&json!({"extras": {"cityscrapers.org/id": 5}})), None);
    }

    #[test]
    fn storage_ids_accept_numbers() {
        assert_eq!(previous_storage_id(&json!({"_id": 42})).as_deref(), Some("42"));
        assert_eq!(previous_storage_id(&json!({"_id": ""})), None);
        assert_eq!(previous_storage_id(&json!({})), None);
    }

    #[test]
    fn fresh_storage_ids_are_unique() {
        let a = new_storage_id();
        let b = new_storage_id();
        assert!(a.starts_with(OCD_ID_PREFIX));
        assert_ne!(a, b);
    }
}
