use crate::bundle::{BundleMetadata, Conclusion, JobBundle};
use crate::layout::{self, is_valid_folder_name, BundlePaths};
use crate::{CaptureError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Identity of the CI run an index describes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunInfo {
    pub run_id: String,
    pub run_number: Option<u64>,
}

impl RunInfo {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            run_number: None,
        }
    }

    /// Read `GITHUB_RUN_ID` / `GITHUB_RUN_NUMBER`, falling back to `"local"`.
    pub fn from_env() -> Self {
        let run_id = std::env::var("GITHUB_RUN_ID")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "local".to_string());
        let run_number = std::env::var("GITHUB_RUN_NUMBER")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok());
        Self { run_id, run_number }
    }
}

/// One job entry of `_job_index.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub job_name: String,
    pub conclusion: Conclusion,
    pub folder: String,
    pub size_bytes: u64,
    pub line_count: u64,
    pub timestamp: DateTime<Utc>,
}

/// A bundle folder left out of the index, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedBundle {
    pub folder: String,
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexDocument {
    run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    run_number: Option<u64>,
    generated_at: DateTime<Utc>,
    jobs: Vec<IndexEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<SkippedBundle>,
}

/// Read-only snapshot of every finalized bundle in one run.
///
/// Built once after all producer jobs have finished. A job whose bundle never
/// arrived is simply absent.
#[derive(Debug, Clone)]
pub struct RunIndex {
    results_dir: PathBuf,
    pub run_id: String,
    pub run_number: Option<u64>,
    pub generated_at: DateTime<Utc>,
    pub bundles: Vec<JobBundle>,
    pub skipped: Vec<SkippedBundle>,
}

/// Scan `workspace/ci_results/` and assemble the index from each bundle's
/// `metadata.json`. Logs are never opened.
///
/// Folders with missing, malformed or still-open metadata are skipped with a
/// warning. A missing results directory yields an empty index.
pub fn build_run_index(workspace: &Path, run: RunInfo) -> Result<RunIndex> {
    let results_dir = layout::ci_results_dir(workspace);
    let mut index = RunIndex {
        results_dir: results_dir.clone(),
        run_id: run.run_id,
        run_number: run.run_number,
        generated_at: Utc::now(),
        bundles: Vec::new(),
        skipped: Vec::new(),
    };

    let entries = match std::fs::read_dir(&results_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("No results directory at {}", results_dir.display());
            return Ok(index);
        }
        Err(err) => return Err(err.into()),
    };

    let mut folders: Vec<String> = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("Failed to read entry in {}: {err}", results_dir.display());
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let folder = entry.file_name().to_string_lossy().into_owned();
        if is_valid_folder_name(&folder) {
            folders.push(folder);
        }
    }
    folders.sort();

    let mut seen_jobs: HashSet<String> = HashSet::new();
    for folder in folders {
        let paths = BundlePaths::new(results_dir.join(&folder));
        let skip_reason = match BundleMetadata::read(&paths.metadata) {
            Err(CaptureError::IoError(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                Some("missing metadata.json".to_string())
            }
            Err(err) => Some(err.to_string()),
            Ok(metadata) => {
                if seen_jobs.contains(&metadata.job_name) {
                    Some(format!("duplicate job name '{}'", metadata.job_name))
                } else {
                    let job_name = metadata.job_name.clone();
                    match JobBundle::from_metadata(&results_dir, &folder, metadata) {
                        Some(bundle) => {
                            seen_jobs.insert(job_name);
                            index.bundles.push(bundle);
                            None
                        }
                        None => Some("capture still in progress (no conclusion)".to_string()),
                    }
                }
            }
        };

        if let Some(reason) = skip_reason {
            log::warn!("Skipping bundle '{folder}': {reason}");
            index.skipped.push(SkippedBundle { folder, reason });
        }
    }

    log::info!(
        "Indexed {} bundles ({} skipped) in {}",
        index.bundles.len(),
        index.skipped.len(),
        results_dir.display()
    );
    Ok(index)
}

impl RunIndex {
    /// Directory holding the bundle folders (`workspace/ci_results`).
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobBundle> {
        self.bundles.iter()
    }

    /// Look a bundle up by job name, falling back to folder name.
    pub fn get(&self, name: &str) -> Option<&JobBundle> {
        let name = name.trim();
        self.bundles
            .iter()
            .find(|b| b.job_name == name)
            .or_else(|| self.bundles.iter().find(|b| b.folder == name))
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.bundles.iter().map(|b| b.job_name.as_str()).collect()
    }

    pub fn entries(&self) -> Vec<IndexEntry> {
        self.bundles
            .iter()
            .map(|b| IndexEntry {
                job_name: b.job_name.clone(),
                conclusion: b.conclusion,
                folder: b.folder.clone(),
                size_bytes: b.size_bytes,
                line_count: b.line_count,
                timestamp: b.created_at,
            })
            .collect()
    }

    /// Persist as `ci_results/_job_index.json`.
    pub fn save(&self) -> Result<PathBuf> {
        let document = IndexDocument {
            run_id: self.run_id.clone(),
            run_number: self.run_number,
            generated_at: self.generated_at,
            jobs: self.entries(),
            skipped: self.skipped.clone(),
        };
        std::fs::create_dir_all(&self.results_dir)?;
        let path = self.results_dir.join(layout::JOB_INDEX_FILE);
        let data = serde_json::to_vec_pretty(&document)?;
        layout::write_atomic(&path, &data)?;
        Ok(path)
    }

    /// Load a previously saved index. `Ok(None)` when no index file exists.
    pub fn load(workspace: &Path) -> Result<Option<Self>> {
        let path = layout::job_index_path(workspace);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let document: IndexDocument = serde_json::from_slice(&bytes)?;
        let results_dir = layout::ci_results_dir(workspace);
        let bundles = document
            .jobs
            .into_iter()
            .map(|entry| {
                let paths = BundlePaths::new(results_dir.join(&entry.folder));
                let summary_path = paths.summary.is_file().then_some(paths.summary);
                JobBundle {
                    job_name: entry.job_name,
                    conclusion: entry.conclusion,
                    folder: entry.folder,
                    log_path: paths.log,
                    summary_path,
                    size_bytes: entry.size_bytes,
                    line_count: entry.line_count,
                    created_at: entry.timestamp,
                }
            })
            .collect();

        Ok(Some(Self {
            results_dir,
            run_id: document.run_id,
            run_number: document.run_number,
            generated_at: document.generated_at,
            bundles,
            skipped: document.skipped,
        }))
    }

    /// Load the saved index, or scan the workspace when none was saved.
    pub fn load_or_build(workspace: &Path, run: RunInfo) -> Result<Self> {
        match Self::load(workspace)? {
            Some(index) => Ok(index),
            None => build_run_index(workspace, run),
        }
    }
}
