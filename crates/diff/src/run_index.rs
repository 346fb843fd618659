use crate::settings::FEED_EXTENSION;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Suffix of files still being written by [`crate::FeedWriter`].
pub(crate) const PARTIAL_SUFFIX: &str = "tmp";

/// Every run file under an output root, grouped by source name.
///
/// Paths per source are kept in string order, which equals chronological order for run
/// directories produced by a valid [`crate::FeedTemplate`].
#[derive(Debug, Clone, Default)]
pub struct RunIndex {
    root: PathBuf,
    runs: HashMap<String, Vec<PathBuf>>,
}

impl RunIndex {
    /// Walk `root` once and index every run file.
    ///
    /// A missing or empty root yields an empty index. Unreadable entries and files that do not
    /// map to a source name are skipped.
    pub fn build(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let mut index = Self {
            root: root.clone(),
            runs: HashMap::new(),
        };

        if !root.is_dir() {
            log::info!("Run index: {} does not exist yet", root.display());
            return index;
        }

        for result in WalkDir::new(&root).follow_links(false) {
            match result {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let path = entry.into_path();
                    match source_name_for(&path) {
                        Some(source) => index.push(source, path),
                        None => log::debug!("Run index: skipping {}", path.display()),
                    }
                }
                Err(e) => log::warn!("Run index: failed to read entry: {e}"),
            }
        }

        for paths in index.runs.values_mut() {
            paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
            paths.dedup();
        }

        log::info!(
            "Run index: {} run files for {} sources under {}",
            index.run_count(),
            index.runs.len(),
            root.display()
        );
        index
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All run files of `source`, oldest first.
    pub fn runs_for(&self, source: &str) -> &[PathBuf] {
        self.runs.get(source).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Most recent run file of `source`: the lexicographically greatest path.
    pub fn latest(&self, source: &str) -> Option<&Path> {
        self.runs_for(source).last().map(PathBuf::as_path)
    }

    /// Source names in sorted order.
    pub fn sources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.runs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn run_count(&self) -> usize {
        self.runs.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Register a run file written after the scan, keeping string order.
    ///
    /// Returns `false` when the path maps to no source or is already indexed.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        let Some(source) = source_name_for(&path) else {
            return false;
        };
        let paths = self.runs.entry(source).or_default();
        match paths.binary_search_by(|probe| probe.as_os_str().cmp(path.as_os_str())) {
            Ok(_) => false,
            Err(pos) => {
                paths.insert(pos, path);
                true
            }
        }
    }

    fn push(&mut self, source: String, path: PathBuf) {
        self.runs.entry(source).or_default().push(path);
    }
}

/// Source name of a run file: its base name minus the feed extension.
///
/// Only `<source>.json` files are runs; partial writes and anything else under the root are not.
fn source_name_for(path: &Path) -> Option<String> {
    let file_name = path.file_name().and_then(OsStr::to_str)?;
    if file_name.starts_with('.') {
        return None;
    }
    let extension = path.extension().and_then(OsStr::to_str)?;
    if !extension.eq_ignore_ascii_case(FEED_EXTENSION) {
        return None;
    }
    let stem = path.file_stem().and_then(OsStr::to_str)?.trim();
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_string())
}
