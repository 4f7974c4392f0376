//! Exactly-one-writer artifact output.
//!
//! [`DedupGuard`] claims an output identity inside one critical section;
//! [`ResultSink`] claims first and writes afterwards, outside the lock, so two
//! workers can never both see an identity as free.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::SinkError;

/// Output identities claimed during one run.
#[derive(Debug, Default)]
pub struct DedupGuard {
    claimed: Mutex<HashSet<String>>,
}

impl DedupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and claim in one step. `false` means someone else got there first.
    pub fn try_claim(&self, id: &str) -> bool {
        self.claimed.lock().insert(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    /// The identity was already claimed; nothing touched the filesystem.
    Duplicate,
}

/// Writes one pretty-printed JSON artifact per output identity.
#[derive(Debug)]
pub struct ResultSink {
    dir: PathBuf,
    guard: DedupGuard,
}

impl ResultSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            guard: DedupGuard::new(),
        }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    pub async fn write<T: Serialize + ?Sized>(
        &self,
        id: &str,
        payload: &T,
    ) -> Result<WriteOutcome, SinkError> {
        let body = serde_json::to_vec_pretty(payload)?;

        if !self.guard.try_claim(id) {
            warn!("Duplicate output identity detected: {id} - skipping write");
            return Ok(WriteOutcome::Duplicate);
        }

        let path = self.path_for(id);
        if let Err(source) = tokio::fs::write(&path, body).await {
            return Err(SinkError::Io { path, source });
        }
        Ok(WriteOutcome::Written(path))
    }
}

/// Prepares an output directory before a run.
pub struct OutputDirectoryManager;

impl OutputDirectoryManager {
    /// Creates `dir` if needed. With `clean`, removes every pre-existing
    /// `*.json` artifact in it and returns how many were removed.
    pub fn reset_if_requested(dir: &Path, clean: bool) -> std::io::Result<usize> {
        std::fs::create_dir_all(dir)?;
        if !clean {
            return Ok(0);
        }

        info!("Cleaning output directory {}", dir.display());
        let mut removed = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "json") {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        info!("Cleaned {removed} artifacts");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn guard_claims_each_identity_once() {
        let guard = DedupGuard::new();
        assert!(guard.try_claim("A___T__1"));
        assert!(!guard.try_claim("A___T__1"));
        assert!(guard.try_claim("A___T__2"));
    }

    #[tokio::test]
    async fn second_write_of_same_identity_is_duplicate() {
        let tmp = TempDir::new().unwrap();
        let sink = ResultSink::new(tmp.path());

        let path = tmp.path().join("A___T__1.json");

        let first = sink.write("A___T__1", &json!({"writer": 1})).await;
        let second = sink.write("A___T__1", &json!({"writer": 2})).await;

        assert_eq!(first.unwrap(), WriteOutcome::Written(path.clone()));
        assert_eq!(second.unwrap(), WriteOutcome::Duplicate);
        let raw = fs::read_to_string(&path).unwrap();
        let on_disk: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk["writer"], 1);
    }

    #[tokio::test]
    async fn concurrent_writers_yield_exactly_one_write() {
        let tmp = TempDir::new().unwrap();
        let sink = Arc::new(ResultSink::new(tmp.path()));

        let handles: Vec<_> = (0..16)
            .map(|n| {
                let sink = sink.clone();
                tokio::spawn(async move { sink.write("same", &json!({ "n": n })).await })
            })
            .collect();

        let mut written = 0;
        for h in handles {
            if matches!(h.await.unwrap().unwrap(), WriteOutcome::Written(_)) {
                written += 1;
            }
        }
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn artifacts_are_pretty_printed_and_keep_unicode() {
        let tmp = TempDir::new().unwrap();
        let sink = ResultSink::new(tmp.path());

        let text = json!({"text": "Không có vấn đề"});
        sink.write("x", &text).await.unwrap();

        let raw = fs::read_to_string(tmp.path().join("x.json")).unwrap();
        assert!(raw.contains("Không có vấn đề"));
        assert!(raw.contains('\n'));
    }

    #[tokio::test]
    async fn write_into_missing_directory_is_io_error() {
        let sink = ResultSink::new("/definitely/not/here");
        let err = sink.write("x", &json!({})).await.unwrap_err();
        assert!(matches!(err, SinkError::Io { .. }));
    }

    #[test]
    fn reset_removes_old_artifacts_only_when_requested() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.json", "b.json", "c.json"] {
            fs::write(tmp.path().join(name), "{}").unwrap();
        }
        fs::write(tmp.path().join(".gitkeep"), "").unwrap();

        let removed = OutputDirectoryManager::reset_if_requested(tmp.path(), false).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 4);

        let removed = OutputDirectoryManager::reset_if_requested(tmp.path(), true).unwrap();
        assert_eq!(removed, 3);
        assert!(tmp.path().join(".gitkeep").exists());
        assert!(!tmp.path().join("a.json").exists());
    }

    #[test]
    fn reset_creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("review");
        OutputDirectoryManager::reset_if_requested(&dir, true).unwrap();
        assert!(dir.is_dir());
    }
}
