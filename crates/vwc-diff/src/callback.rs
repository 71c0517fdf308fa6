//! Event sink for diff results.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use vwc_types::{Dtype, RelativePath};

/// Receives the events of a diff run.
///
/// Tasks run concurrently, so every method may be invoked from several
/// threads at once. The engine never serializes calls.
pub trait DiffCallback: Send + Sync {
    /// `path` exists in the live tree but in no snapshot tree.
    fn added_path(&self, path: &RelativePath, dtype: Dtype);
    /// `path` exists in a snapshot tree but not in the live tree.
    fn removed_path(&self, path: &RelativePath, dtype: Dtype);
    /// `path` exists on both sides with different content or type.
    fn modified_path(&self, path: &RelativePath, dtype: Dtype);
    /// `path` is untracked and matched by an ignore rule.
    fn ignored_path(&self, path: &RelativePath, dtype: Dtype);
}

/// Source-control status of a single file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Removed,
    Modified,
    Ignored,
}

impl FileStatus {
    /// Single-letter code, as printed by `vwc status`.
    pub fn code(&self) -> char {
        match self {
            Self::Added => 'A',
            Self::Removed => 'R',
            Self::Modified => 'M',
            Self::Ignored => 'I',
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
            Self::Ignored => "ignored",
        };
        f.write_str(s)
    }
}

/// Per-file status map produced by [`StatusCollector`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmStatus {
    pub entries: BTreeMap<RelativePath, FileStatus>,
}

impl ScmStatus {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, path: &RelativePath) -> Option<FileStatus> {
        self.entries.get(path).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RelativePath, FileStatus)> {
        self.entries.iter().map(|(path, status)| (path, *status))
    }
}

/// A [`DiffCallback`] that folds events into a [`ScmStatus`].
///
/// Directory events are dropped: a directory only matters through the files
/// beneath it. A file reported twice (a shape change reports the path once
/// as removed and once as added) keeps its first status.
#[derive(Debug, Default)]
pub struct StatusCollector {
    status: Mutex<ScmStatus>,
}

impl StatusCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything collected so far.
    pub fn status(&self) -> ScmStatus {
        self.status.lock().expect("lock poisoned").clone()
    }

    pub fn into_status(self) -> ScmStatus {
        self.status.into_inner().expect("lock poisoned")
    }

    fn record(&self, path: &RelativePath, dtype: Dtype, status: FileStatus) {
        if dtype.is_dir() {
            return;
        }
        self.status
            .lock()
            .expect("lock poisoned")
            .entries
            .entry(path.clone())
            .or_insert(status);
    }
}

impl DiffCallback for StatusCollector {
    fn added_path(&self, path: &RelativePath, dtype: Dtype) {
        self.record(path, dtype, FileStatus::Added);
    }

    fn removed_path(&self, path: &RelativePath, dtype: Dtype) {
        self.record(path, dtype, FileStatus::Removed);
    }

    fn modified_path(&self, path: &RelativePath, dtype: Dtype) {
        self.record(path, dtype, FileStatus::Modified);
    }

    fn ignored_path(&self, path: &RelativePath, dtype: Dtype) {
        self.record(path, dtype, FileStatus::Ignored);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> RelativePath {
        RelativePath::new(s).unwrap()
    }

    #[test]
    fn directory_events_are_dropped() {
        let collector = StatusCollector::new();
        collector.added_path(&path("dir"), Dtype::Dir);
        collector.added_path(&path("dir/file"), Dtype::Regular);
        let status = collector.into_status();
        assert_eq!(status.len(), 1);
        assert_eq!(status.get(&path("dir/file")), Some(FileStatus::Added));
    }

    #[test]
    fn first_status_wins() {
        let collector = StatusCollector::new();
        collector.removed_path(&path("x"), Dtype::Symlink);
        collector.added_path(&path("x"), Dtype::Regular);
        assert_eq!(collector.status().get(&path("x")), Some(FileStatus::Removed));
    }

    #[test]
    fn status_serializes_lowercase() {
        let collector = StatusCollector::new();
        collector.ignored_path(&path("build.log"), Dtype::Regular);
        let json = serde_json::to_string(&collector.status()).unwrap();
        assert_eq!(json, r#"{"entries":{"build.log":"ignored"}}"#);
    }

    #[test]
    fn codes() {
        assert_eq!(FileStatus::Added.code(), 'A');
        assert_eq!(FileStatus::Modified.to_string(), "modified");
    }
}
