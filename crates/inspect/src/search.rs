use ciscope_capture::JobBundle;
use ciscope_protocol::BudgetTruncation;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::lines::LossyLines;
use crate::patterns::build_regex;
use crate::toolkit::Inspector;
use crate::Result;

/// Caller-side search knobs. `None` means the configured default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub context_lines: Option<usize>,
    pub max_matches: Option<usize>,
    pub case_sensitive: bool,
    /// Match the pattern as plain text rather than a regex.
    pub literal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub line_number: usize,
    pub line: String,
    /// Up to `context_lines` lines preceding the match, oldest first.
    pub before: Vec<String>,
    /// Up to `context_lines` lines following the match.
    pub after: Vec<String>,
}

impl SearchMatch {
    pub fn first_line_number(&self) -> usize {
        self.line_number - self.before.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub job_name: String,
    pub pattern: String,
    pub context_lines: usize,
    pub max_matches: usize,
    pub matches: Vec<SearchMatch>,
    /// The cap was reached; more matches may exist further down the log.
    pub hit_match_limit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation: Option<BudgetTruncation>,
}

impl Inspector<'_> {
    /// Line-oriented regex search. At most `max_matches` matches are returned,
    /// each with its own context window; overlapping windows are not merged.
    /// The scan stops once the cap is reached and the last window is filled.
    pub fn search(
        &self,
        bundle: &JobBundle,
        pattern: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult> {
        let regex = build_regex(pattern, options.case_sensitive, options.literal)?;
        let context = self.config().context_lines(options.context_lines);
        let max_matches = self.config().max_matches(options.max_matches);

        let mut window: VecDeque<String> = VecDeque::with_capacity(context + 1);
        let mut matches: Vec<SearchMatch> = Vec::new();
        let mut awaiting_after: Vec<usize> = Vec::new();

        for line in LossyLines::open(&bundle.log_path)? {
            let (line_number, text) = line?;

            for &idx in &awaiting_after {
                matches[idx].after.push(text.clone());
            }
            awaiting_after.retain(|&idx| matches[idx].after.len() < context);

            if matches.len() < max_matches && regex.is_match(&text) {
                matches.push(SearchMatch {
                    line_number,
                    line: text.clone(),
                    before: window.iter().cloned().collect(),
                    after: Vec::new(),
                });
                if context > 0 {
                    awaiting_after.push(matches.len() - 1);
                }
            }

            if context > 0 {
                if window.len() == context {
                    window.pop_front();
                }
                window.push_back(text);
            }

            if matches.len() >= max_matches && awaiting_after.is_empty() {
                break;
            }
        }

        let hit_match_limit = matches.len() >= max_matches;
        if hit_match_limit {
            log::debug!(
                "search '{pattern}' on '{}' hit the {max_matches}-match cap",
                bundle.job_name
            );
        }
        Ok(SearchResult {
            job_name: bundle.job_name.clone(),
            pattern: pattern.to_string(),
            context_lines: context,
            max_matches,
            matches,
            hit_match_limit,
            truncation: hit_match_limit.then_some(BudgetTruncation::MaxMatches),
        })
    }
}
