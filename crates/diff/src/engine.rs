use crate::format::OutputFormat;
use crate::previous::{IdentityMap, PreviousResults};
use crate::run_index::RunIndex;
use crate::settings::DiffConfig;
use crate::stats::DiffStats;
use crate::{DiffError, Result};
use chrono::NaiveDateTime;
use civic_record::{NormalizedRecord, Status};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffPhase {
    Uninitialized,
    Loaded,
    Active,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Never persisted before; the sink assigns a storage id.
    Insert,
    /// Persisted by a prior run; the sink reuses its storage id.
    Update,
}

/// A record forwarded downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffedRecord {
    pub record: NormalizedRecord,
    pub storage_id: Option<String>,
    pub change: ChangeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffDecision {
    Emit(DiffedRecord),
    /// Same identity already forwarded earlier in this run.
    Duplicate { identity: String },
}

impl DiffDecision {
    pub fn into_emitted(self) -> Option<DiffedRecord> {
        match self {
            DiffDecision::Emit(diffed) => Some(diffed),
            DiffDecision::Duplicate { .. } => None,
        }
    }
}

/// What is left once a run reports it has no more work.
#[derive(Debug, Clone, PartialEq)]
pub struct Finalized {
    /// Prior records whose identity never showed up in this run.
    pub carried_forward: Vec<Value>,
    pub stats: DiffStats,
}

/// Per-run diff state for one source.
///
/// ```text
/// UNINITIALIZED ──load()/first diff()──> LOADED ──diff()──> ACTIVE ──finalize()──> FINALIZED
/// ```
///
/// The prior run is read lazily, once. The identity map and the set of identities seen in this
/// run live only as long as the engine; construct one engine per run and pass it by `&mut` to
/// every call site that emits records.
pub struct DiffEngine<'a> {
    index: &'a RunIndex,
    source_name: String,
    format: OutputFormat,
    phase: DiffPhase,
    previous: PreviousResults,
    identities: IdentityMap,
    scraped: HashSet<String>,
    stats: DiffStats,
}

impl<'a> DiffEngine<'a> {
    pub fn new(config: &DiffConfig, index: &'a RunIndex, source_name: impl Into<String>) -> Self {
        let source_name = source_name.into();
        Self {
            index,
            format: config.format,
            phase: DiffPhase::Uninitialized,
            previous: PreviousResults::empty(),
            identities: IdentityMap::default(),
            scraped: HashSet::new(),
            stats: DiffStats::new(source_name.clone()),
            source_name,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn phase(&self) -> DiffPhase {
        self.phase
    }

    pub fn stats(&self) -> &DiffStats {
        &self.stats
    }

    pub fn previous(&self) -> &PreviousResults {
        &self.previous
    }

    pub fn identity_map(&self) -> &IdentityMap {
        &self.identities
    }

    /// Read the latest prior run and build the identity map. No-op once loaded.
    pub fn load(&mut self) -> Result<()> {
        match self.phase {
            DiffPhase::Uninitialized => {}
            DiffPhase::Loaded | DiffPhase::Active => return Ok(()),
            DiffPhase::Finalized => {
                return Err(DiffError::InvalidState(format!(
                    "{}: load after finalize",
                    self.source_name
                )))
            }
        }

        let previous = PreviousResults::for_source(self.index, &self.source_name)?;
        let identities = previous.identity_map(self.format);

        self.stats.previous_records = previous.len();
        self.stats.identities_loaded = identities.len();
        self.stats.skipped_previous = identities.skipped();
        if identities.skipped() > 0 {
            log::warn!(
                "{}: {} prior records carry no identity or storage id",
                self.source_name,
                identities.skipped()
            );
        }

        self.previous = previous;
        self.identities = identities;
        self.phase = DiffPhase::Loaded;
        Ok(())
    }

    /// Decide what happens to one freshly extracted record.
    ///
    /// Repeats of an identity already seen in this run are suppressed. Everything else is
    /// forwarded, tagged with the prior storage id when one exists.
    pub fn diff(&mut self, mut record: NormalizedRecord) -> Result<DiffDecision> {
        if self.phase == DiffPhase::Finalized {
            return Err(DiffError::InvalidState(format!(
                "{}: record {} arrived after finalize",
                self.source_name, record.identity
            )));
        }
        self.load()?;
        self.phase = DiffPhase::Active;

        // Extractors may edit title or start after construction.
        record.assign_identity();
        if record.source_name != self.source_name {
            log::warn!(
                "{}: record {} reports source {}",
                self.source_name,
                record.identity,
                record.source_name
            );
        }

        if !self.scraped.insert(record.identity.clone()) {
            self.stats.duplicates += 1;
            log::debug!("{}: dropping duplicate {}", self.source_name, record.identity);
            return Ok(DiffDecision::Duplicate {
                identity: record.identity,
            });
        }

        let diffed = match self.identities.storage_id(&record.identity) {
            Some(storage_id) => {
                self.stats.updated += 1;
                DiffedRecord {
                    storage_id: Some(storage_id.to_string()),
                    change: ChangeKind::Update,
                    record,
                }
            }
            None => {
                self.stats.inserted += 1;
                DiffedRecord {
                    storage_id: None,
                    change: ChangeKind::Insert,
                    record,
                }
            }
        };
        Ok(DiffDecision::Emit(diffed))
    }

    /// Diff a batch, returning only the forwarded records.
    pub fn diff_all(
        &mut self,
        records: impl IntoIterator<Item = NormalizedRecord>,
    ) -> Result<Vec<DiffedRecord>> {
        let mut emitted = Vec::new();
        for record in records {
            if let Some(diffed) = self.diff(record)?.into_emitted() {
                emitted.push(diffed);
            }
        }
        Ok(emitted)
    }

    /// Close the run. Pure: reads nothing, writes nothing.
    ///
    /// Prior records not seen in this run are handed back for re-emission; the ones starting
    /// after `now` are marked cancelled since they vanished from an upcoming schedule.
    pub fn finalize(&mut self, now: NaiveDateTime) -> Result<Finalized> {
        match self.phase {
            DiffPhase::Loaded | DiffPhase::Active => {}
            DiffPhase::Uninitialized => {
                return Err(DiffError::InvalidState(format!(
                    "{}: finalize before load",
                    self.source_name
                )))
            }
            DiffPhase::Finalized => {
                return Err(DiffError::InvalidState(format!(
                    "{}: finalized twice",
                    self.source_name
                )))
            }
        }

        let mut carried_forward = Vec::new();
        let mut carried_ids = HashSet::new();
        for previous in self.previous.records() {
            let Some(identity) = self.format.previous_identity(previous) else {
                continue;
            };
            if self.scraped.contains(identity) || !carried_ids.insert(identity.to_string()) {
                continue;
            }

            let mut event = previous.clone();
            let upcoming = self
                .format
                .previous_start(&event)
                .is_some_and(|start| start > now);
            if upcoming {
                self.format.mark_status(&mut event, Status::Cancelled);
                self.stats.cancelled += 1;
            }
            carried_forward.push(event);
        }
        self.stats.carried_forward = carried_forward.len();
        self.phase = DiffPhase::Finalized;

        log::info!(
            "{}: {} new, {} updated, {} duplicates dropped, {} carried forward ({} cancelled)",
            self.source_name,
            self.stats.inserted,
            self.stats.updated,
            self.stats.duplicates,
            self.stats.carried_forward,
            self.stats.cancelled
        );

        Ok(Finalized {
            carried_forward,
            stats: self.stats.clone(),
        })
    }
}
