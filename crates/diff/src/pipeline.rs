use crate::engine::{DiffEngine, DiffedRecord};
use crate::stats::DiffStats;
use crate::Result;
use chrono::NaiveDateTime;
use civic_record::NormalizedRecord;
use serde_json::Value;

/// Everything a finished run produced, handed to the completion hook exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRun {
    pub source_name: String,
    pub emitted: Vec<DiffedRecord>,
    pub carried_forward: Vec<Value>,
    pub stats: DiffStats,
}

impl CompletedRun {
    /// Lines the run file will hold.
    pub fn line_count(&self) -> usize {
        self.emitted.len() + self.carried_forward.len()
    }
}

/// Called when a source has no more work for the current run.
pub trait CompletionHook {
    fn on_idle(&mut self, run: &CompletedRun) -> Result<()>;
}

impl<H: CompletionHook + ?Sized> CompletionHook for Box<H> {
    fn on_idle(&mut self, run: &CompletedRun) -> Result<()> {
        (**self).on_idle(run)
    }
}

/// Record stream → diff engine → completion hook.
pub struct DiffPipeline<'a, H> {
    engine: DiffEngine<'a>,
    hook: H,
    emitted: Vec<DiffedRecord>,
}

impl<'a, H: CompletionHook> DiffPipeline<'a, H> {
    pub fn new(engine: DiffEngine<'a>, hook: H) -> Self {
        Self {
            engine,
            hook,
            emitted: Vec::new(),
        }
    }

    pub fn engine(&self) -> &DiffEngine<'a> {
        &self.engine
    }

    pub fn emitted(&self) -> &[DiffedRecord] {
        &self.emitted
    }

    /// Diff one record. Returns the forwarded record, or `None` for a duplicate.
    pub fn process(&mut self, record: NormalizedRecord) -> Result<Option<&DiffedRecord>> {
        match self.engine.diff(record)?.into_emitted() {
            Some(diffed) => {
                self.emitted.push(diffed);
                Ok(self.emitted.last())
            }
            None => Ok(None),
        }
    }

    /// Diff a batch; returns how many records were forwarded.
    pub fn process_all(
        &mut self,
        records: impl IntoIterator<Item = NormalizedRecord>,
    ) -> Result<usize> {
        let before = self.emitted.len();
        for record in records {
            self.process(record)?;
        }
        Ok(self.emitted.len() - before)
    }

    /// Finalize the engine and fire the completion hook.
    ///
    /// The prior run is loaded here when no record ever arrived, so an empty run still carries
    /// prior records forward.
    pub fn close(mut self, now: NaiveDateTime) -> Result<(CompletedRun, H)> {
        self.engine.load()?;
        let finalized = self.engine.finalize(now)?;
        let run = CompletedRun {
            source_name: self.engine.source_name().to_string(),
            emitted: self.emitted,
            carried_forward: finalized.carried_forward,
            stats: finalized.stats,
        };
        self.hook.on_idle(&run)?;
        Ok((run, self.hook))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ChangeKind;
    use crate::run_index::RunIndex;
    use crate::settings::DiffSettings;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Recorder {
        runs: Vec<CompletedRun>,
    }

    impl CompletionHook for Recorder {
        fn on_idle(&mut self, run: &CompletedRun) -> Result<()> {
            self.runs.push(run.clone());
            Ok(())
        }
    }

    fn at(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, month, day)
            .and_then(|date| date.and_hms_opt(19, 0, 0))
            .expect("valid datetime")
    }

    #[test]
    fn hook_fires_once_with_emitted_records() {
        let temp = tempdir().unwrap();
        let config = DiffSettings {
            output_dir: temp.path().to_path_buf(),
            ..DiffSettings::default()
        }
        .validate()
        .unwrap();
        let index = RunIndex::build(temp.path());
        let engine = DiffEngine::new(&config, &index, "s");
        let mut pipeline = DiffPipeline::new(engine, Recorder::default());

        let forwarded = pipeline
            .process_all([
                NormalizedRecord::new("s", "Council", at(5, 20)),
                NormalizedRecord::new("s", "Council", at(5, 20)),
                NormalizedRecord::new("s", "Council", at(6, 17)),
            ])
            .unwrap();
        assert_eq!(forwarded, 2);

        let (run, hook) = pipeline.close(at(10, 18)).unwrap();
        assert_eq!(hook.runs.len(), 1);
        assert_eq!(hook.runs[0], run);
        assert_eq!(run.source_name, "s");
        assert_eq!(run.line_count(), 2);
        assert_eq!(run.stats.duplicates, 1);
        assert!(run.emitted.iter().all(|d| d.change == ChangeKind::Insert));
    }

    #[test]
    fn empty_run_still_closes() {
        let temp = tempdir().unwrap();
        let config = DiffSettings {
            output_dir: temp.path().to_path_buf(),
            ..DiffSettings::default()
        }
        .validate()
        .unwrap();
        let index = RunIndex::build(temp.path());
        let engine = DiffEngine::new(&config, &index, "s");
        let pipeline = DiffPipeline::new(engine, Recorder::default());

        let (run, hook) = pipeline.close(at(10, 18)).unwrap();
        assert_eq!(run.line_count(), 0);
        assert_eq!(hook.runs.len(), 1);
    }
}
