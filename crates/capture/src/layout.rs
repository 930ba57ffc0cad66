//! On-disk contract shared by capture, indexing and inspection.
//!
//! ```text
//! workspace/
//!   ci_results/
//!     _job_index.json
//!     <job folder>/
//!       log.txt
//!       summary.md      (optional)
//!       metadata.json
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

pub const CI_RESULTS_DIR: &str = "ci_results";
pub const JOB_INDEX_FILE: &str = "_job_index.json";
pub const LOG_FILE: &str = "log.txt";
pub const SUMMARY_FILE: &str = "summary.md";
pub const METADATA_FILE: &str = "metadata.json";

#[must_use]
pub fn ci_results_dir(workspace: &Path) -> PathBuf {
    workspace.join(CI_RESULTS_DIR)
}

#[must_use]
pub fn job_index_path(workspace: &Path) -> PathBuf {
    ci_results_dir(workspace).join(JOB_INDEX_FILE)
}

/// Folder name for a job. Anything outside `[A-Za-z0-9._-]` becomes `_` so a
/// job name can never escape the results directory.
#[must_use]
pub fn job_folder_name(job_name: &str) -> String {
    job_name
        .trim()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

pub(crate) fn is_valid_folder_name(folder: &str) -> bool {
    !folder.is_empty() && folder != "." && folder != ".." && !folder.starts_with('_')
}

/// Paths of the files inside one bundle folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePaths {
    pub dir: PathBuf,
    pub log: PathBuf,
    pub summary: PathBuf,
    pub metadata: PathBuf,
}

impl BundlePaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            log: dir.join(LOG_FILE),
            summary: dir.join(SUMMARY_FILE),
            metadata: dir.join(METADATA_FILE),
            dir,
        }
    }
}

/// Write through a sibling temp file and rename, so readers never observe a
/// half-written document.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)
}
