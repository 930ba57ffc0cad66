use ciscope_protocol::env::{override_from_env, LARGE_LOG_BYTES_ENV, SMALL_LOG_BYTES_ENV};
use serde::{Deserialize, Serialize};

use crate::patterns::StatPattern;
use crate::size::SizeThresholds;

/// Policy knobs for the inspection operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
    pub thresholds: SizeThresholds,

    /// Patterns counted by `get_stats`, in report order.
    pub stat_patterns: Vec<StatPattern>,

    pub default_context_lines: usize,
    pub default_max_matches: usize,

    /// Hard caps applied to caller-supplied search options.
    pub max_context_lines: usize,
    pub max_matches_cap: usize,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            thresholds: SizeThresholds::default(),
            stat_patterns: StatPattern::defaults(),
            default_context_lines: 3,
            default_max_matches: 50,
            max_context_lines: 50,
            max_matches_cap: 1_000,
        }
    }
}

impl InspectConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.thresholds.validate()?;

        if self.stat_patterns.is_empty() {
            return Err("stat_patterns must not be empty".to_string());
        }
        for pattern in &self.stat_patterns {
            if pattern.label.trim().is_empty() {
                return Err("stat pattern labels must not be empty".to_string());
            }
            pattern.compile().map_err(|err| err.to_string())?;
        }

        if self.default_max_matches == 0 || self.max_matches_cap == 0 {
            return Err("max_matches limits must be > 0".to_string());
        }
        if self.default_max_matches > self.max_matches_cap {
            return Err(format!(
                "default_max_matches ({}) cannot exceed max_matches_cap ({})",
                self.default_max_matches, self.max_matches_cap
            ));
        }
        if self.default_context_lines > self.max_context_lines {
            return Err(format!(
                "default_context_lines ({}) cannot exceed max_context_lines ({})",
                self.default_context_lines, self.max_context_lines
            ));
        }
        Ok(())
    }

    /// Apply `CISCOPE_SMALL_LOG_BYTES` / `CISCOPE_LARGE_LOG_BYTES`.
    pub fn with_env_overrides(mut self) -> Self {
        self.thresholds.small_bytes =
            override_from_env(SMALL_LOG_BYTES_ENV, self.thresholds.small_bytes);
        self.thresholds.large_bytes =
            override_from_env(LARGE_LOG_BYTES_ENV, self.thresholds.large_bytes);
        self
    }

    pub(crate) fn context_lines(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_context_lines)
            .min(self.max_context_lines)
    }

    /// A requested cap of 0 is honoured and yields no matches.
    pub(crate) fn max_matches(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_max_matches)
            .min(self.max_matches_cap)
    }
}
