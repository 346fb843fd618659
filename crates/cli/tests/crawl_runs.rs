use chrono::{NaiveDate, NaiveDateTime};
use civic_cli::{run_source, CrawlReport};
use civic_diff::{DiffConfig, DiffError, DiffSettings, RunIndex};
use civic_sources::monroeville::{self, CALENDAR_ID};
use civic_sources::{FixtureTransport, SourceOptions};
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const PAGE_1: &str = include_str!("../../sources/tests/fixtures/monroeville_page1.json");
const PAGE_2: &str = include_str!("../../sources/tests/fixtures/monroeville_page2.json");

fn at(m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, m, d)
        .and_then(|date| date.and_hms_opt(h, 0, 0))
        .expect("valid datetime")
}

fn diff_config(root: &Path) -> DiffConfig {
    DiffSettings {
        output_dir: root.to_path_buf(),
        ..DiffSettings::default()
    }
    .validate()
    .expect("valid settings")
}

fn transport() -> FixtureTransport {
    FixtureTransport::new()
        .with("pageToken=page-2", PAGE_2)
        .with(CALENDAR_ID, PAGE_1)
}

async fn crawl_monroeville(
    root: &Path,
    started_at: NaiveDateTime,
    dry_run: bool,
) -> anyhow::Result<CrawlReport> {
    let options = SourceOptions::at(started_at, started_at)
        .with_google_api_key(Some("test-key".to_string()));
    let mut source = monroeville::monroeville(&options)?;
    let config = diff_config(root);
    let index = RunIndex::build(root);
    run_source(&mut source, &transport(), &config, &index, started_at, dry_run).await
}

fn storage_ids(path: &Path) -> BTreeMap<String, String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let event: Value = serde_json::from_str(line).unwrap();
            (
                event["extras"]["cityscrapers.org/id"]
                    .as_str()
                    .unwrap()
                    .to_string(),
                event["_id"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn first_run_is_all_new_across_both_pages() {
    let temp = tempdir().unwrap();
    let report = crawl_monroeville(temp.path(), at(10, 18, 9), false)
        .await
        .unwrap();

    assert_eq!(report.source, "monroeville_public_meetings");
    assert_eq!(report.batches, 2);
    assert_eq!(report.stats.inserted, 5);
    assert_eq!(report.stats.updated, 0);
    assert_eq!(report.stats.duplicates, 0);
    assert_eq!(report.stats.previous_records, 0);

    let output = report.output.expect("run file");
    assert_eq!(
        output,
        temp.path()
            .join("2020/10/18/090000/monroeville_public_meetings.json")
    );
    let ids = storage_ids(&output);
    assert_eq!(ids.len(), 5);
    assert!(ids.values().all(|id| id.starts_with("ocd-event/")));
}

#[tokio::test]
async fn second_run_updates_every_record() {
    let temp = tempdir().unwrap();
    let first = crawl_monroeville(temp.path(), at(10, 18, 9), false)
        .await
        .unwrap();
    let second = crawl_monroeville(temp.path(), at(10, 19, 9), false)
        .await
        .unwrap();

    assert_eq!(second.stats.previous_records, 5);
    assert_eq!(second.stats.inserted, 0);
    assert_eq!(second.stats.updated, 5);
    assert_eq!(second.stats.duplicates, 0);
    assert_eq!(second.stats.carried_forward, 0);

    let first_ids = storage_ids(&first.output.expect("first run file"));
    let second_ids = storage_ids(&second.output.expect("second run file"));
    assert_eq!(first_ids, second_ids);
}

#[tokio::test]
async fn dry_run_writes_nothing_and_keeps_the_baseline() {
    let temp = tempdir().unwrap();
    crawl_monroeville(temp.path(), at(10, 18, 9), false)
        .await
        .unwrap();

    let dry = crawl_monroeville(temp.path(), at(10, 19, 9), true)
        .await
        .unwrap();
    assert!(dry.dry_run);
    assert_eq!(dry.output, None);
    assert_eq!(dry.stats.updated, 5);
    assert_eq!(RunIndex::build(temp.path()).run_count(), 1);
}

#[tokio::test]
async fn corrupt_prior_run_fails_the_source() {
    let temp = tempdir().unwrap();
    let prior = temp
        .path()
        .join("2020/10/17/090000/monroeville_public_meetings.json");
    fs::create_dir_all(prior.parent().unwrap()).unwrap();
    fs::write(&prior, "{\"_id\": \"ocd-event/1\"\n").unwrap();

    let err = crawl_monroeville(temp.path(), at(10, 18, 9), false)
        .await
        .expect_err("corrupt prior run");
    assert!(matches!(
        err.downcast_ref::<DiffError>(),
        Some(DiffError::CorruptPriorRun { line: 1, .. })
    ));
    assert!(!temp.path().join("2020/10/18").exists());
}
