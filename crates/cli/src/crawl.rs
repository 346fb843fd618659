use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use civic_diff::{DiffConfig, DiffEngine, DiffPipeline, DiffStats, FeedWriter, RunIndex};
use civic_sources::{MeetingSource, Transport};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of crawling one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlReport {
    pub source: String,
    pub batches: usize,
    pub dry_run: bool,
    /// Run file written, `None` for a dry run.
    pub output: Option<PathBuf>,
    pub stats: DiffStats,
}

impl CrawlReport {
    pub fn summary_line(&self) -> String {
        let target = match (&self.output, self.dry_run) {
            (Some(path), _) => path.display().to_string(),
            (None, true) => "dry run, nothing written".to_string(),
            (None, false) => "nothing written".to_string(),
        };
        format!(
            "{}: {} new, {} updated, {} duplicates, {} carried forward ({} cancelled) -> {}",
            self.source,
            self.stats.inserted,
            self.stats.updated,
            self.stats.duplicates,
            self.stats.carried_forward,
            self.stats.cancelled,
            target
        )
    }
}

/// Drain `source` through its own diff engine and write one run file.
///
/// `started_at` is the run clock: it names the run directory and decides which vanished meetings
/// are still upcoming.
pub async fn run_source(
    source: &mut dyn MeetingSource,
    transport: &dyn Transport,
    config: &DiffConfig,
    index: &RunIndex,
    started_at: NaiveDateTime,
    dry_run: bool,
) -> Result<CrawlReport> {
    let info = source.info().clone();
    let engine = DiffEngine::new(config, index, info.name.clone());
    let feed = FeedWriter::new(config, info.clone(), started_at).dry_run(dry_run);
    let mut pipeline = DiffPipeline::new(engine, feed);

    let mut batches = 0;
    while let Some(batch) = source
        .next_batch(transport)
        .await
        .with_context(|| format!("{}: fetch failed", info.name))?
    {
        batches += 1;
        log::debug!("{}: batch {batches} with {} records", info.name, batch.len());
        pipeline
            .process_all(batch)
            .with_context(|| format!("{}: diff failed", info.name))?;
    }

    let (run, feed) = pipeline
        .close(started_at)
        .with_context(|| format!("{}: completing run failed", info.name))?;

    Ok(CrawlReport {
        source: info.name,
        batches,
        dry_run,
        output: feed.written_path().map(Path::to_path_buf),
        stats: run.stats,
    })
}
