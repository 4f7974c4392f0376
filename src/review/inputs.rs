//! Readers for the per-item records that accompany each query file.

use std::io::ErrorKind;
use std::path::PathBuf;

use serde_json::Value;

use crate::error::CompanionError;
use crate::items::WorkItem;

/// Reads `<dir>/<item stem>.json`.
#[derive(Debug, Clone)]
pub struct CompanionReader {
    dir: PathBuf,
}

impl CompanionReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, item: &WorkItem) -> PathBuf {
        self.dir.join(item.json_name())
    }

    pub async fn read(&self, item: &WorkItem) -> Result<Value, CompanionError> {
        let path = self.path_for(item);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(CompanionError::NotFound(path)),
            Err(source) => return Err(CompanionError::Io { path, source }),
        };
        serde_json::from_str(&raw).map_err(|source| CompanionError::Json { path, source })
    }

    /// Number of `*.json` records in the directory; zero when it does not exist.
    pub fn count(&self) -> usize {
        std::fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|e| e.path().extension().is_some_and(|x| x == "json"))
                    .count()
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use tempfile::TempDir;

    fn item() -> WorkItem {
        WorkItem::from_path(std::path::Path::new("/q/A___T1__1.sql")).unwrap()
    }

    #[tokio::test]
    async fn reads_json_named_after_item() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("A___T1__1.json"), r#"{"executions": 42}"#).unwrap();

        let reader = CompanionReader::new(tmp.path());
        let value = reader.read(&item()).await.unwrap();

        assert_eq!(value["executions"], 42);
        assert_eq!(reader.count(), 1);
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let reader = CompanionReader::new(tmp.path());
        let err = reader.read(&item()).await.unwrap_err();
        assert!(matches!(err, CompanionError::NotFound(p) if p.ends_with("A___T1__1.json")));
    }

    #[tokio::test]
    async fn malformed_record_is_json_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("A___T1__1.json"), "{not json").unwrap();
        let reader = CompanionReader::new(tmp.path());
        let err = reader.read(&item()).await.unwrap_err();
        assert!(matches!(err, CompanionError::Json { .. }));
    }

    #[test]
    fn count_of_missing_directory_is_zero() {
        assert_eq!(CompanionReader::new("/definitely/not/here").count(), 0);
    }
}
