use crate::format::OutputFormat;
use crate::run_index::RunIndex;
use crate::{DiffError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Records persisted by the most recent prior run of one source.
#[derive(Debug, Clone, Default)]
pub struct PreviousResults {
    path: Option<PathBuf>,
    records: Vec<Value>,
}

impl PreviousResults {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the latest run file of `source`, or nothing when the source has never run.
    pub fn for_source(index: &RunIndex, source: &str) -> Result<Self> {
        match index.latest(source) {
            Some(path) => {
                log::info!("Diffing {source} against {}", path.display());
                Self::load(path)
            }
            None => {
                log::info!("No prior runs for {source}; every record is new");
                Ok(Self::empty())
            }
        }
    }

    /// Parse a newline-delimited JSON run file.
    ///
    /// Any line that is not valid JSON fails the whole load. Blank lines are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: Value = serde_json::from_str(&line).map_err(|source| {
                DiffError::CorruptPriorRun {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    source,
                }
            })?;
            records.push(record);
        }

        Ok(Self {
            path: Some(path.to_path_buf()),
            records,
        })
    }

    /// File these records came from, `None` for an empty result set.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Map every tagged prior record's identity to its storage id.
    ///
    /// Records missing either are skipped. If an identity repeats, the last line wins.
    pub fn identity_map(&self, format: OutputFormat) -> IdentityMap {
        let mut map = IdentityMap::default();
        for record in &self.records {
            let Some(identity) = format.previous_identity(record) else {
                map.skipped += 1;
                log::debug!("Prior record without identity skipped");
                continue;
            };
            let Some(storage_id) = format.previous_storage_id(record) else {
                map.skipped += 1;
                log::debug!("Prior record {identity} without storage id skipped");
                continue;
            };
            map.by_identity.insert(identity.to_string(), storage_id);
        }
        map
    }
}

/// Identity → storage id lookup, derived from [`PreviousResults`] once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
    by_identity: HashMap<String, String>,
    skipped: usize,
}

impl IdentityMap {
    pub fn storage_id(&self, identity: &str) -> Option<&str> {
        self.by_identity.get(identity).map(String::as_str)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.by_identity.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    /// Prior records that carried no usable identity or storage id.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn write_lines(path: &Path, lines: &[&str]) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, lines.join("\n")).expect("write");
    }

    #[test]
    fn no_prior_runs_loads_empty() {
        let temp = tempdir().unwrap();
        let index = RunIndex::build(temp.path());
        let previous = PreviousResults::for_source(&index, "monroeville").unwrap();
        assert!(previous.is_empty());
        assert_eq!(previous.path(), None);
        assert!(previous.identity_map(OutputFormat::Ocd).is_empty());
    }

    #[test]
    fn loads_latest_run_only() {
        let temp = tempdir().unwrap();
        write_lines(
            &temp.path().join("2020/05/20/190000/s.json"),
            &[r#"{"_id": "old", "extras": {"cityscrapers.org/id": "s/a"}}"#],
        );
        let latest = temp.path().join("2020/07/15/190000/s.json");
        write_lines(
            &latest,
            &[
                r#"{"_id": "ocd-event/1", "extras": {"cityscrapers.org/id": "s/a"}}"#,
                r#"{"_id": "ocd-event/2", "extras": {"cityscrapers.org/id": "s/b"}}"#,
            ],
        );

        let index = RunIndex::build(temp.path());
        let previous = PreviousResults::for_source(&index, "s").unwrap();
        assert_eq!(previous.path(), Some(latest.as_path()));
        assert_eq!(previous.len(), 2);

        let map = previous.identity_map(OutputFormat::Ocd);
        assert_eq!(map.len(), 2);
        assert_eq!(map.storage_id("s/a"), Some("ocd-event/1"));
        assert_eq!(map.storage_id("s/b"), Some("ocd-event/2"));
    }

    #[test]
    fn malformed_line_is_fatal() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("2020/07/15/190000/s.json");
        write_lines(
            &path,
            &[
                r#"{"_id": "ocd-event/1", "extras": {"cityscrapers.org/id": "s/a"}}"#,
                r#"{"_id": "ocd-event/2", "extras": "#,
            ],
        );

        let err = PreviousResults::load(&path).expect_err("corrupt file must not load");
        match err {
            DiffError::CorruptPriorRun { path: p, line, .. } => {
                assert_eq!(p, path);
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_lines_are_ignored() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("s.json");
        write_lines(&path, &[r#"{"_id": "a"}"#, "", "   ", r#"{"_id": "b"}"#, ""]);
        assert_eq!(PreviousResults::load(&path).unwrap().len(), 2);
    }

    #[test]
    fn untagged_records_are_skipped_not_fatal() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("s.json");
        write_lines(
            &path,
            &[
                r#"{"_id": "ocd-event/1", "extras": {"cityscrapers.org/id": "s/a"}}"#,
                r#"{"_id": "ocd-event/2", "extra": {"cityscrapers.org/id": "s/b"}}"#,
                r#"{"_id": "ocd-event/3"}"#,
                r#"{"extras": {"cityscrapers.org/id": "s/d"}}"#,
            ],
        );

        let map = PreviousResults::load(&path)
            .unwrap()
            .identity_map(OutputFormat::Ocd);
        assert_eq!(map.len(), 2);
        assert_eq!(map.skipped(), 2);
        assert!(map.contains("s/b"));
        assert!(!map.contains("s/d"));
    }
}
