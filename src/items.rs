//! Work items: one captured query file each.
//!
//! File names follow `<agent>___<transaction>__<index>.<ext>`. The stem is the
//! item's output identity; companion records and review artifacts are named
//! after it.

use std::fmt;
use std::path::{Path, PathBuf};

use glob::Pattern;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{name}` does not follow <agent>___<transaction>__<index>: {reason}")]
pub struct ItemNameError {
    pub name: String,
    pub reason: &'static str,
}

/// Agent, transaction and query index parsed from a file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemIdentity {
    pub agent: String,
    pub transaction: String,
    pub index: u32,
}

impl ItemIdentity {
    pub fn parse(stem: &str) -> Result<Self, ItemNameError> {
        let fail = |reason| ItemNameError {
            name: stem.to_string(),
            reason,
        };
        let (agent, rest) = stem
            .split_once("___")
            .ok_or_else(|| fail("missing `___` after agent"))?;
        let (transaction, index) = rest
            .rsplit_once("__")
            .ok_or_else(|| fail("missing `__` before index"))?;
        if agent.is_empty() {
            return Err(fail("empty agent"));
        }
        if transaction.is_empty() {
            return Err(fail("empty transaction"));
        }
        let index = index.parse().map_err(|_| fail("index is not a number"))?;
        Ok(Self {
            agent: agent.to_string(),
            transaction: transaction.to_string(),
            index,
        })
    }
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}___{}__{}", self.agent, self.transaction, self.index)
    }
}

/// One unit of input. Immutable once enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    identity: ItemIdentity,
    stem: String,
    file_name: String,
    source: PathBuf,
}

impl WorkItem {
    pub fn from_path(path: &Path) -> Result<Self, ItemNameError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let identity = ItemIdentity::parse(&stem)?;
        Ok(Self {
            identity,
            stem,
            file_name,
            source: path.to_path_buf(),
        })
    }

    pub fn identity(&self) -> &ItemIdentity {
        &self.identity
    }

    /// Output identity: the file stem.
    pub fn name(&self) -> &str {
        &self.stem
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// `<stem>.json`, the name shared by companion records and artifacts.
    pub fn json_name(&self) -> String {
        format!("{}.json", self.stem)
    }
}

/// Enumerates work items from one directory.
pub struct WorkItemSource {
    dir: PathBuf,
    pattern: Pattern,
}

impl WorkItemSource {
    pub fn new(dir: impl Into<PathBuf>, pattern: &str) -> Result<Self, PipelineError> {
        Ok(Self {
            dir: dir.into(),
            pattern: Pattern::new(pattern)?,
        })
    }

    /// Files directly inside the directory whose names match the pattern,
    /// sorted by file name. Names outside the identity scheme are logged and
    /// left out.
    pub fn list(&self) -> Result<Vec<WorkItem>, PipelineError> {
        let mut items = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if !self.pattern.matches(&name) {
                continue;
            }
            match WorkItem::from_path(entry.path()) {
                Ok(item) => items.push(item),
                Err(e) => warn!("Ignoring {}: {e}", entry.path().display()),
            }
        }
        Ok(items)
    }
}

/// Narrows `items` to those matching any of `filters`, then keeps the first `limit`.
///
/// A filter matches when it equals the file name or is contained in it,
/// ignoring case. Results follow filter order, each item at most once.
pub fn select(items: Vec<WorkItem>, filters: &[String], limit: Option<usize>) -> Vec<WorkItem> {
    let mut selected = if filters.is_empty() {
        items
    } else {
        let original = items.len();
        let mut picked: Vec<WorkItem> = Vec::new();
        for filter in filters {
            let needle = filter.to_lowercase();
            for item in &items {
                let name = item.file_name().to_lowercase();
                if name.contains(&needle) && !picked.iter().any(|p| p.source == item.source) {
                    picked.push(item.clone());
                }
            }
        }
        info!(
            "File filtering: processing {} of {original} files matching patterns: {}",
            picked.len(),
            filters.join(", ")
        );
        picked
    };

    if let Some(limit) = limit.filter(|&n| n > 0) {
        let original = selected.len();
        selected.truncate(limit);
        let kept = selected.len();
        info!("Limit mode: processing first {kept} of {original} files");
    }
    selected
}
