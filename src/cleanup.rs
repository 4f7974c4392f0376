//! Removal of artifacts left by earlier runs.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::PipelineError;

const GITKEEP: &str = ".gitkeep";
const GITKEEP_CONTENT: &str = "# Keep this directory in git\n";

/// Files found (and, unless dry-running, deleted) under one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirCleanup {
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
}

impl DirCleanup {
    pub fn count(&self) -> usize {
        self.files.len()
    }
}

/// Empties every sub-directory of `base_dir` recursively, keeping `.gitkeep`
/// files and re-creating them where missing. Directories are left in place.
pub fn clean_outputs(base_dir: &Path, dry_run: bool) -> Result<Vec<DirCleanup>, PipelineError> {
    if !base_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut report = Vec::new();
    for entry in WalkDir::new(base_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.path();

        let mut files = Vec::new();
        for file in WalkDir::new(dir).sort_by_file_name() {
            let file = file?;
            if file.file_type().is_file() && file.file_name() != GITKEEP {
                files.push(file.into_path());
            }
        }

        if !dry_run {
            for file in &files {
                std::fs::remove_file(file)?;
            }
            let gitkeep = dir.join(GITKEEP);
            if !gitkeep.exists() {
                std::fs::write(&gitkeep, GITKEEP_CONTENT)?;
            }
            info!("Deleted {} files in {}", files.len(), dir.display());
        } else {
            debug!("Would delete {} files in {}", files.len(), dir.display());
        }

        report.push(DirCleanup {
            dir: dir.to_path_buf(),
            files,
        });
    }
    Ok(report)
}

/// Deletes `*.log` files directly inside `logs_dir`.
pub fn clean_logs(logs_dir: &Path, dry_run: bool) -> Result<DirCleanup, PipelineError> {
    let mut files = Vec::new();
    if logs_dir.is_dir() {
        for entry in WalkDir::new(logs_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_file() && entry.path().extension().is_some_and(|e| e == "log") {
                files.push(entry.into_path());
            }
        }
    }

    if !dry_run {
        for file in &files {
            std::fs::remove_file(file)?;
        }
        info!(
            "Deleted {} log files in {}",
            files.len(),
            logs_dir.display()
        );
    }

    Ok(DirCleanup {
        dir: logs_dir.to_path_buf(),
        files,
    })
}
