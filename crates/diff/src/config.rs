use ciscope_protocol::env::{override_from_env, DIFF_MEDIUM_LINES_ENV, DIFF_SMALL_LINES_ENV};
use serde::{Deserialize, Serialize};

use crate::{DiffError, Result};

/// Configuration for adaptive diff sampling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Diffs with fewer changed lines pass through untouched
    pub small_threshold: usize,

    /// Diffs below this (and at least `small_threshold`) are keyword-filtered
    pub medium_threshold: usize,

    /// Minimum risk score for a file to be kept by risk ranking
    pub min_risk_score: i32,

    /// Maximum number of files kept by risk ranking
    pub max_risk_files: usize,

    /// Files kept when nothing reaches `min_risk_score`
    pub fallback_top_n: usize,

    /// Changed-line budget for the risk-ranked sample
    pub max_sampled_changed_lines: usize,

    /// Maximum intent keywords taken from commit messages
    pub max_keywords: usize,

    /// Shorter tokens are not considered keywords
    pub min_keyword_len: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            small_threshold: 100,
            medium_threshold: 500,
            min_risk_score: 3,
            max_risk_files: 12,
            fallback_top_n: 1,
            max_sampled_changed_lines: 300,
            max_keywords: 8,
            min_keyword_len: 4,
        }
    }
}

impl SamplingConfig {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.small_threshold > self.medium_threshold {
            return Err(format!(
                "small_threshold ({}) cannot exceed medium_threshold ({})",
                self.small_threshold, self.medium_threshold
            ));
        }
        if self.max_sampled_changed_lines == 0 {
            return Err("max_sampled_changed_lines must be > 0".to_string());
        }
        if self.max_sampled_changed_lines >= self.medium_threshold {
            return Err(format!(
                "max_sampled_changed_lines ({}) must stay below medium_threshold ({}) so large diffs shrink",
                self.max_sampled_changed_lines, self.medium_threshold
            ));
        }
        if self.max_risk_files == 0 || self.fallback_top_n == 0 {
            return Err("max_risk_files and fallback_top_n must be > 0".to_string());
        }
        Ok(())
    }

    pub fn validated(self) -> Result<Self> {
        self.validate().map_err(DiffError::InvalidConfig)?;
        Ok(self)
    }

    /// Apply `CISCOPE_DIFF_SMALL_LINES` / `CISCOPE_DIFF_MEDIUM_LINES`.
    pub fn with_env_overrides(mut self) -> Self {
        self.small_threshold = override_from_env(DIFF_SMALL_LINES_ENV, self.small_threshold);
        self.medium_threshold = override_from_env(DIFF_MEDIUM_LINES_ENV, self.medium_threshold);
        self
    }
}
