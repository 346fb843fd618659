use crate::pipeline::{CompletedRun, CompletionHook};
use crate::run_index::PARTIAL_SUFFIX;
use crate::settings::DiffConfig;
use crate::Result;
use chrono::NaiveDateTime;
use civic_record::SourceInfo;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes one run file per completed run, under the configured feed template.
///
/// The file is written next to its final location with a `.tmp` suffix and renamed into place,
/// so a crashed run never leaves a half-written file for the next run to diff against.
#[derive(Debug, Clone)]
pub struct FeedWriter {
    config: DiffConfig,
    info: SourceInfo,
    started_at: NaiveDateTime,
    dry_run: bool,
    written: Option<PathBuf>,
    replaced: bool,
}

impl FeedWriter {
    pub fn new(config: &DiffConfig, info: SourceInfo, started_at: NaiveDateTime) -> Self {
        Self {
            config: config.clone(),
            info,
            started_at,
            dry_run: false,
            written: None,
            replaced: false,
        }
    }

    /// Render lines but leave the filesystem alone.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn target_path(&self) -> PathBuf {
        self.config
            .template
            .run_file(&self.config.output_dir, self.started_at, &self.info.name)
    }

    /// Path of the file written by the last [`FeedWriter::write`], if any.
    pub fn written_path(&self) -> Option<&Path> {
        self.written.as_deref()
    }

    /// Whether the last write replaced a run file that was already on disk.
    pub fn replaced_existing(&self) -> bool {
        self.replaced
    }

    /// Run-file lines: fresh records first, carried-forward prior records after.
    pub fn render(&self, run: &CompletedRun) -> Result<Vec<Value>> {
        let mut lines = Vec::with_capacity(run.line_count());
        for diffed in &run.emitted {
            lines.push(self.config.format.render(diffed, &self.info, self.started_at)?);
        }
        lines.extend(run.carried_forward.iter().cloned());
        Ok(lines)
    }

    pub fn write(&mut self, run: &CompletedRun) -> Result<PathBuf> {
        if run.source_name != self.info.name {
            log::warn!(
                "Feed for {} receives run of {}",
                self.info.name,
                run.source_name
            );
        }
        let lines = self.render(run)?;
        let target = self.target_path();
        self.replaced = target.exists();
        if self.replaced {
            log::warn!(
                "Replacing run file {} written by an earlier run in the same second",
                target.display()
            );
        }
        write_lines_atomic(&target, &lines)?;
        log::info!("Wrote {} lines to {}", lines.len(), target.display());
        self.written = Some(target.clone());
        Ok(target)
    }
}

impl CompletionHook for FeedWriter {
    fn on_idle(&mut self, run: &CompletedRun) -> Result<()> {
        if self.dry_run {
            let lines = self.render(run)?;
            log::info!(
                "Dry run: {} lines for {} not written",
                lines.len(),
                self.target_path().display()
            );
            return Ok(());
        }
        self.write(run).map(|_| ())
    }
}

fn write_lines_atomic(path: &Path, lines: &[Value]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".");
    tmp_name.push(PARTIAL_SUFFIX);
    let tmp = PathBuf::from(tmp_name);

    {
        let mut out = BufWriter::new(File::create(&tmp)?);
        for line in lines {
            serde_json::to_writer(&mut out, line)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ChangeKind, DiffedRecord};
    use crate::settings::DiffSettings;
    use crate::stats::DiffStats;
    use chrono::NaiveDate;
    use civic_record::NormalizedRecord;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn started() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 7, 15)
            .and_then(|date| date.and_hms_opt(8, 30, 5))
            .expect("valid datetime")
    }

    fn writer(root: &Path) -> FeedWriter {
        let config = DiffSettings {
            output_dir: root.to_path_buf(),
            ..DiffSettings::default()
        }
        .validate()
        .unwrap();
        let info = SourceInfo::new("s", "Borough of S", "America/New_York");
        FeedWriter::new(&config, info, started())
    }

    fn run() -> CompletedRun {
        let record = NormalizedRecord::new("s", "Council", started());
        CompletedRun {
            source_name: "s".to_string(),
            emitted: vec![
                DiffedRecord {
                    record: record.clone(),
                    storage_id: Some("ocd-event/kept".to_string()),
                    change: ChangeKind::Update,
                },
                DiffedRecord {
                    record: NormalizedRecord::new("s", "Planning", started()),
                    storage_id: None,
                    change: ChangeKind::Insert,
                },
            ],
            carried_forward: vec![serde_json::json!({"_id": "ocd-event/gone"})],
            stats: DiffStats::new("s"),
        }
    }

    #[test]
    fn writes_ndjson_under_the_template() {
        let temp = tempdir().unwrap();
        let mut feed = writer(temp.path());
        let path = feed.write(&run()).unwrap();

        assert_eq!(path, temp.path().join("2020/07/15/083005/s.json"));
        assert_eq!(feed.written_path(), Some(path.as_path()));
        assert!(!path.with_extension("json.tmp").exists());

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["_id"], "ocd-event/kept");
        assert!(lines[1]["_id"].as_str().unwrap().starts_with("ocd-event/"));
        assert_eq!(lines[2]["_id"], "ocd-event/gone");
    }

    #[test]
    fn second_write_in_the_same_second_replaces_the_file() {
        let temp = tempdir().unwrap();
        let mut first = writer(temp.path());
        let path = first.write(&run()).unwrap();
        assert!(!first.replaced_existing());

        let mut second = writer(temp.path());
        let mut rerun = run();
        rerun.carried_forward.clear();
        assert_eq!(second.write(&rerun).unwrap(), path);
        assert!(second.replaced_existing());
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn dry_run_leaves_no_file() {
        let temp = tempdir().unwrap();
        let mut feed = writer(temp.path()).dry_run(true);
        feed.on_idle(&run()).unwrap();

        assert!(feed.written_path().is_none());
        assert!(!feed.target_path().exists());
    }
}
