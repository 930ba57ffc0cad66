use ciscope_capture::JobBundle;
use serde::Serialize;

use crate::lines::LossyLines;
use crate::patterns::{CompiledPattern, Severity};
use crate::toolkit::Inspector;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternCount {
    pub label: String,
    pub severity: Severity,
    /// Lines containing at least one hit.
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsRecommendation {
    /// Error-severity hits: search for them.
    Investigate,
    /// Only warnings: the summary is probably enough.
    CheckSummary,
    Clean,
}

impl StatsRecommendation {
    pub fn message(self) -> &'static str {
        match self {
            Self::Investigate => "log contains errors or failures; use search to investigate",
            Self::CheckSummary => "log has warnings but may have passed; check the summary first",
            Self::Clean => "log appears clean; the summary should be enough",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogStats {
    pub job_name: String,
    pub size_bytes: u64,
    pub line_count: u64,
    pub counts: Vec<PatternCount>,
    pub recommendation: StatsRecommendation,
}

impl LogStats {
    pub fn count(&self, label: &str) -> u64 {
        self.counts
            .iter()
            .find(|c| c.label == label)
            .map_or(0, |c| c.count)
    }

    pub fn error_count(&self) -> u64 {
        self.count("error")
    }

    pub fn warning_count(&self) -> u64 {
        self.count("warning")
    }

    pub fn failed_count(&self) -> u64 {
        self.count("failed")
    }

    pub fn exception_count(&self) -> u64 {
        self.count("exception")
    }
}

impl Inspector<'_> {
    /// One streaming pass over the log counting the configured patterns.
    pub fn get_stats(&self, bundle: &JobBundle) -> Result<LogStats> {
        let compiled = self
            .config()
            .stat_patterns
            .iter()
            .map(|p| p.compile())
            .collect::<Result<Vec<CompiledPattern>>>()?;
        let mut counts = vec![0u64; compiled.len()];
        let mut line_count = 0u64;

        for line in LossyLines::open(&bundle.log_path)? {
            let (_, text) = line?;
            line_count += 1;
            for (slot, pattern) in counts.iter_mut().zip(&compiled) {
                if pattern.is_match(&text) {
                    *slot += 1;
                }
            }
        }

        let counts: Vec<PatternCount> = compiled
            .into_iter()
            .zip(counts)
            .map(|(pattern, count)| PatternCount {
                label: pattern.label,
                severity: pattern.severity,
                count,
            })
            .collect();
        let recommendation = recommend(&counts);
        Ok(LogStats {
            job_name: bundle.job_name.clone(),
            size_bytes: bundle.size_bytes,
            line_count,
            counts,
            recommendation,
        })
    }
}

fn recommend(counts: &[PatternCount]) -> StatsRecommendation {
    let hits = |severity: Severity| {
        counts
            .iter()
            .any(|c| c.severity == severity && c.count > 0)
    };
    if hits(Severity::Error) {
        StatsRecommendation::Investigate
    } else if hits(Severity::Warning) {
        StatsRecommendation::CheckSummary
    } else {
        StatsRecommendation::Clean
    }
}
