//! # ciscope diff
//!
//! Adaptive sampling of unified diffs so that review input stays bounded
//! whatever the size of the change.
//!
//! | changed lines             | strategy                                        |
//! |---------------------------|-------------------------------------------------|
//! | `< small_threshold`       | pass through unchanged                          |
//! | `< medium_threshold`      | files matching commit-intent keywords           |
//! | otherwise                 | highest-risk files within a changed-line budget |
//!
//! A medium diff whose commit messages yield no usable keyword falls back to
//! risk ranking. Nothing here fails on malformed input.

mod commits;
mod config;
mod error;
mod keywords;
mod parse;
mod risk;
mod sample;

pub use commits::{parse_commits_json, summarize_commits, CommitAuthor, CommitInfo, CommitSummary};
pub use config::SamplingConfig;
pub use error::{DiffError, Result};
pub use keywords::extract_intent_keywords;
pub use parse::{
    parse_diff, summarize_diff, total_changed_lines, DiffHunk, FileDiff, FileSummary, ParsedDiff,
};
pub use risk::{
    classify_file_type, explain_score, identify_critical_paths, is_config_path, is_test_path,
    review_focus_areas, risk_score, score_with, FileType, FocusArea, RiskInput, RiskRule,
    DEFAULT_RULES, RISKY_PATH_KEYWORDS,
};
pub use sample::{smart_diff_sample, ChangedFile, DiffTier, SampledDiff, SamplingStrategy};
