use chrono::{DateTime, Utc};
use ciscope_capture::{Conclusion, JobBundle, RunIndex, SkippedBundle};
use ciscope_protocol::{BudgetTruncation, CostClass};
use serde::Serialize;

use crate::config::InspectConfig;
use crate::lines::LossyLines;
use crate::size::SizeClass;
use crate::{InspectError, Result};

/// Returned by `read_summary` when a job published no summary.
pub const NO_SUMMARY: &str = "no summary available";

/// The inspection operations, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ReadIndex,
    CheckSize,
    ReadSummary,
    GetStats,
    Search,
    ReadFull,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::ReadIndex,
        Operation::CheckSize,
        Operation::ReadSummary,
        Operation::GetStats,
        Operation::Search,
        Operation::ReadFull,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ReadIndex => "read_index",
            Self::CheckSize => "check_size",
            Self::ReadSummary => "read_summary",
            Self::GetStats => "get_stats",
            Self::Search => "search",
            Self::ReadFull => "read_full",
        }
    }

    pub fn cost(self) -> CostClass {
        match self {
            Self::ReadIndex | Self::CheckSize | Self::ReadSummary => CostClass::Cheap,
            Self::GetStats | Self::Search => CostClass::Medium,
            Self::ReadFull => CostClass::Expensive,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ReadIndex => "List every job bundle with status and size. Call first.",
            Self::CheckSize => "Classify one log as small, medium or large from stored metadata.",
            Self::ReadSummary => "Read the short summary a job published, if any.",
            Self::GetStats => "Count error/warning patterns in one streaming pass.",
            Self::Search => "Regex search with context lines, capped at max_matches.",
            Self::ReadFull => "Read a log; refused for large logs unless max_lines is given.",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexOverviewEntry {
    pub job_name: String,
    pub conclusion: Conclusion,
    pub folder: String,
    pub size_bytes: u64,
    pub size_class: SizeClass,
    pub line_count: u64,
    pub has_summary: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexOverview {
    pub run_id: String,
    pub run_number: Option<u64>,
    pub jobs: Vec<IndexOverviewEntry>,
    pub skipped: Vec<SkippedBundle>,
}

impl IndexOverview {
    pub fn failed_jobs(&self) -> impl Iterator<Item = &IndexOverviewEntry> {
        self.jobs
            .iter()
            .filter(|job| job.conclusion == Conclusion::Failure)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SizeReport {
    pub job_name: String,
    pub size_bytes: u64,
    pub line_count: u64,
    pub classification: SizeClass,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_name: String,
    pub summary: Option<String>,
}

impl JobSummary {
    /// Summary text, or the [`NO_SUMMARY`] sentinel.
    pub fn text(&self) -> &str {
        self.summary.as_deref().unwrap_or(NO_SUMMARY)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FullLog {
    pub job_name: String,
    pub size_bytes: u64,
    pub content: String,
    pub lines_returned: usize,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation: Option<BudgetTruncation>,
}

/// Read-side view over one run. Every operation works from the explicit
/// [`RunIndex`] it was built with; nothing resolves a well-known path.
#[derive(Debug, Clone, Copy)]
pub struct Inspector<'a> {
    index: &'a RunIndex,
    config: &'a InspectConfig,
}

impl<'a> Inspector<'a> {
    pub fn new(index: &'a RunIndex, config: &'a InspectConfig) -> Self {
        Self { index, config }
    }

    pub fn index(&self) -> &'a RunIndex {
        self.index
    }

    pub fn config(&self) -> &'a InspectConfig {
        self.config
    }

    /// Resolve a job by name or folder. Absence is an expected outcome.
    pub fn bundle(&self, job: &str) -> Result<&'a JobBundle> {
        self.index.get(job).ok_or_else(|| InspectError::JobNotFound {
            job_name: job.trim().to_string(),
            available: self
                .index
                .job_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
    }

    pub fn classify(&self, bundle: &JobBundle) -> SizeClass {
        self.config.thresholds.classify(bundle.size_bytes)
    }

    /// Overview built from in-memory metadata only.
    pub fn read_index(&self) -> IndexOverview {
        let jobs = self
            .index
            .iter()
            .map(|bundle| IndexOverviewEntry {
                job_name: bundle.job_name.clone(),
                conclusion: bundle.conclusion,
                folder: bundle.folder.clone(),
                size_bytes: bundle.size_bytes,
                size_class: self.classify(bundle),
                line_count: bundle.line_count,
                has_summary: bundle.has_summary(),
                timestamp: bundle.created_at,
            })
            .collect();
        IndexOverview {
            run_id: self.index.run_id.clone(),
            run_number: self.index.run_number,
            jobs,
            skipped: self.index.skipped.clone(),
        }
    }

    /// Stored size only; the log file is never touched.
    pub fn check_size(&self, bundle: &JobBundle) -> SizeReport {
        let classification = self.classify(bundle);
        SizeReport {
            job_name: bundle.job_name.clone(),
            size_bytes: bundle.size_bytes,
            line_count: bundle.line_count,
            classification,
            recommendation: classification.recommendation().to_string(),
        }
    }

    pub fn read_summary(&self, bundle: &JobBundle) -> JobSummary {
        let summary = bundle
            .summary_path
            .as_deref()
            .and_then(|path| match std::fs::read(path) {
                Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
                Err(err) => {
                    log::warn!("Summary for '{}' unreadable: {err}", bundle.job_name);
                    None
                }
            });
        JobSummary {
            job_name: bundle.job_name.clone(),
            summary,
        }
    }

    /// Read the log. Large logs are refused unless `max_lines` bounds the read;
    /// with `max_lines` exactly that many lines from the start are returned.
    pub fn read_full(&self, bundle: &JobBundle, max_lines: Option<usize>) -> Result<FullLog> {
        let Some(max_lines) = max_lines else {
            if !self.classify(bundle).allows_unbounded_read() {
                return Err(InspectError::SizeLimitExceeded {
                    job_name: bundle.job_name.clone(),
                    size_bytes: bundle.size_bytes,
                    threshold_bytes: self.config.thresholds.large_bytes,
                });
            }
            let bytes = std::fs::read(&bundle.log_path)?;
            let content = String::from_utf8_lossy(&bytes).into_owned();
            let lines_returned = content.lines().count();
            return Ok(FullLog {
                job_name: bundle.job_name.clone(),
                size_bytes: bundle.size_bytes,
                content,
                lines_returned,
                truncated: false,
                truncation: None,
            });
        };

        let mut lines = LossyLines::open(&bundle.log_path)?;
        let mut content = String::new();
        let mut lines_returned = 0usize;
        while lines_returned < max_lines {
            let Some((_, raw)) = lines.next_raw()? else {
                break;
            };
            content.push_str(&raw);
            lines_returned += 1;
        }
        let truncated = lines.next_raw()?.is_some();
        if truncated {
            log::debug!(
                "read_full on '{}' stopped at {max_lines} lines",
                bundle.job_name
            );
        }
        Ok(FullLog {
            job_name: bundle.job_name.clone(),
            size_bytes: bundle.size_bytes,
            content,
            lines_returned,
            truncated,
            truncation: truncated.then_some(BudgetTruncation::MaxLines),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_are_listed_cheapest_first() {
        let costs: Vec<CostClass> = Operation::ALL.iter().map(|op| op.cost()).collect();
        let mut sorted = costs.clone();
        sorted.sort();
        assert_eq!(costs, sorted);
        assert_eq!(Operation::ReadFull.cost(), CostClass::Expensive);
        assert_eq!(Operation::Search.name(), "search");
    }

    #[test]
    fn summary_sentinel_when_absent() {
        let summary = JobSummary {
            job_name: "lint".to_string(),
            summary: None,
        };
        assert_eq!(summary.text(), NO_SUMMARY);
    }
}
