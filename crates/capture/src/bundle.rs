use crate::layout::{self, BundlePaths};
use crate::{CaptureError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Final state of a CI job, as reported by the CI platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conclusion {
    Success,
    Failure,
    Cancelled,
    Skipped,
}

impl Conclusion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for Conclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Conclusion {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "skipped" => Ok(Self::Skipped),
            _ => Err(CaptureError::InvalidConclusion(s.to_string())),
        }
    }
}

/// Contents of `metadata.json`. Written as a placeholder when capture starts
/// (`conclusion: null`) and rewritten once at finalize. A bundle counts as
/// finalized as soon as it carries a conclusion; `finalized_at` is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub job_name: String,
    pub conclusion: Option<Conclusion>,
    pub size_bytes: u64,
    pub line_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
}

impl BundleMetadata {
    pub fn placeholder(job_name: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            job_name: job_name.to_string(),
            conclusion: None,
            size_bytes: 0,
            line_count: 0,
            created_at,
            finalized_at: None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.conclusion.is_some()
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|err| CaptureError::MalformedMetadata {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        layout::write_atomic(path, &data)?;
        Ok(())
    }
}

/// One finalized job's captured output, as seen by readers.
///
/// `size_bytes` and `line_count` come from the metadata written at finalize and
/// are never re-measured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobBundle {
    pub job_name: String,
    pub conclusion: Conclusion,
    pub folder: String,
    pub log_path: PathBuf,
    pub summary_path: Option<PathBuf>,
    pub size_bytes: u64,
    pub line_count: u64,
    pub created_at: DateTime<Utc>,
}

impl JobBundle {
    /// Build from finalized metadata found in `folder` under `results_dir`.
    /// Returns `None` for placeholder metadata.
    pub(crate) fn from_metadata(
        results_dir: &Path,
        folder: &str,
        metadata: BundleMetadata,
    ) -> Option<Self> {
        let conclusion = metadata.conclusion?;
        let paths = BundlePaths::new(results_dir.join(folder));
        let summary_path = paths.summary.is_file().then_some(paths.summary);
        Some(Self {
            job_name: metadata.job_name,
            conclusion,
            folder: folder.to_string(),
            log_path: paths.log,
            summary_path,
            size_bytes: metadata.size_bytes,
            line_count: metadata.line_count,
            created_at: metadata.created_at,
        })
    }

    pub fn has_summary(&self) -> bool {
        self.summary_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conclusion_parses_platform_spellings() {
        assert_eq!("success".parse::<Conclusion>().unwrap(), Conclusion::Success);
        assert_eq!(" FAILURE ".parse::<Conclusion>().unwrap(), Conclusion::Failure);
        assert_eq!("canceled".parse::<Conclusion>().unwrap(), Conclusion::Cancelled);
        assert_eq!("skipped".parse::<Conclusion>().unwrap(), Conclusion::Skipped);
        assert!("neutral".parse::<Conclusion>().is_err());
    }

    #[test]
    fn placeholder_metadata_is_not_finalized() {
        let meta = BundleMetadata::placeholder("lint", Utc::now());
        assert!(!meta.is_finalized());
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json["conclusion"].is_null());
        assert!(json.get("finalized_at").is_none());
    }

    #[test]
    fn only_metadata_with_a_conclusion_yields_a_bundle() {
        let mut meta = BundleMetadata::placeholder("lint", Utc::now());
        assert!(JobBundle::from_metadata(Path::new("/tmp"), "lint", meta.clone()).is_none());

        meta.conclusion = Some(Conclusion::Failure);
        meta.size_bytes = 12;
        let bundle = JobBundle::from_metadata(Path::new("/tmp"), "lint", meta).unwrap();
        assert_eq!(bundle.conclusion, Conclusion::Failure);
        assert_eq!(bundle.log_path, Path::new("/tmp/lint/log.txt"));
        assert_eq!(bundle.size_bytes, 12);
    }

    #[test]
    fn malformed_metadata_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, "{\"job_name\": 3}").unwrap();
        let err = BundleMetadata::read(&path).unwrap_err();
        assert!(matches!(err, CaptureError::MalformedMetadata { .. }));
        assert!(err.to_string().contains("metadata.json"));
    }
}
