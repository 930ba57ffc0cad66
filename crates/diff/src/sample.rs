use ciscope_protocol::BudgetTruncation;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::SamplingConfig;
use crate::keywords::extract_intent_keywords;
use crate::parse::{parse_diff, DiffHunk, FileDiff};
use crate::risk::{classify_file_type, review_focus_areas, risk_score, FileType, FocusArea};

/// Size tier chosen from the total changed-line count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffTier {
    Small,
    Medium,
    Large,
}

/// How the sample was actually produced (Medium may fall back to risk ranking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    PassThrough,
    IntentKeywords,
    RiskRanked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedFile {
    pub path: String,
    pub additions: usize,
    pub deletions: usize,
    pub risk_score: i32,
    pub file_type: FileType,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampledDiff {
    pub tier: DiffTier,
    pub strategy: SamplingStrategy,
    pub commit_intent_keywords: Vec<String>,
    pub total_changed_lines: usize,
    pub changed_files: Vec<ChangedFile>,
    pub review_focus_areas: BTreeSet<FocusArea>,
    /// Paths whose hunks appear in `sampled_diff_text`, in diff order.
    pub selected_files: Vec<String>,
    pub sampled_changed_lines: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation: Option<BudgetTruncation>,
    pub sampled_diff_text: String,
}

impl SampledDiff {
    pub fn is_pass_through(&self) -> bool {
        self.strategy == SamplingStrategy::PassThrough
    }
}

fn tier_for(total: usize, config: &SamplingConfig) -> DiffTier {
    if total < config.small_threshold {
        DiffTier::Small
    } else if total < config.medium_threshold {
        DiffTier::Medium
    } else {
        DiffTier::Large
    }
}

/// Reduce `diff_text` to a bounded sample for review.
///
/// * small: returned unchanged
/// * medium: files whose path or changed lines mention an intent keyword
/// * large (or medium without usable keywords): highest-risk files, capped
///   at `max_sampled_changed_lines` changed lines
///
/// Never fails; a non-empty input always yields a non-empty sample.
pub fn smart_diff_sample<S: AsRef<str>>(
    diff_text: &str,
    commit_messages: &[S],
    config: &SamplingConfig,
) -> SampledDiff {
    let parsed = parse_diff(diff_text);
    let total = parsed.total_changed_lines();
    let tier = tier_for(total, config);
    let keywords =
        extract_intent_keywords(commit_messages, config.max_keywords, config.min_keyword_len);

    let scores: Vec<i32> = parsed.files.iter().map(risk_score).collect();
    let changed_files: Vec<ChangedFile> = parsed
        .files
        .iter()
        .zip(&scores)
        .map(|(file, &risk_score)| ChangedFile {
            path: file.path.clone(),
            additions: file.additions(),
            deletions: file.deletions(),
            risk_score,
            file_type: classify_file_type(&file.path),
        })
        .collect();
    let focus = review_focus_areas(&parsed.files);

    let mut sample = SampledDiff {
        tier,
        strategy: SamplingStrategy::PassThrough,
        commit_intent_keywords: keywords,
        total_changed_lines: total,
        changed_files,
        review_focus_areas: focus,
        selected_files: parsed.files.iter().map(|f| f.path.clone()).collect(),
        sampled_changed_lines: total,
        truncation: None,
        sampled_diff_text: String::new(),
    };

    if tier == DiffTier::Small {
        sample.sampled_diff_text = diff_text.to_string();
        return sample;
    }

    if tier == DiffTier::Medium {
        let matching = keyword_matches(&parsed.files, &sample.commit_intent_keywords);
        if matching.iter().all(|&m| m) {
            sample.strategy = SamplingStrategy::IntentKeywords;
            sample.sampled_diff_text = diff_text.to_string();
            return sample;
        }
        if matching.iter().any(|&m| m) {
            let kept: Vec<(&FileDiff, Vec<KeptHunk<'_>>)> = parsed
                .files
                .iter()
                .zip(&matching)
                .filter(|&(_, &m)| m)
                .map(|(file, _)| (file, file.hunks.iter().map(KeptHunk::Whole).collect()))
                .collect();
            sample.strategy = SamplingStrategy::IntentKeywords;
            finish(&mut sample, diff_text, &kept, None);
            return sample;
        }
        if sample.commit_intent_keywords.is_empty() {
            log::debug!("No usable intent keywords; falling back to risk ranking");
        } else {
            log::debug!(
                "Intent keywords {:?} matched no file; falling back to risk ranking",
                sample.commit_intent_keywords
            );
        }
    }

    sample.strategy = SamplingStrategy::RiskRanked;
    let has_changes: Vec<bool> = parsed.files.iter().map(|f| f.changed_lines() > 0).collect();
    let order = risk_order(&scores, &has_changes, config);
    let (kept, truncated) = spend_budget(&parsed.files, &order, config.max_sampled_changed_lines);
    finish(
        &mut sample,
        diff_text,
        &kept,
        truncated.then_some(BudgetTruncation::MaxChangedLines),
    );
    sample
}

fn keyword_matches(files: &[FileDiff], keywords: &[String]) -> Vec<bool> {
    files
        .iter()
        .map(|file| {
            let path = file.path.to_lowercase();
            keywords.iter().any(|kw| {
                path.contains(kw.as_str())
                    || file
                        .changed_text()
                        .any(|line| line.to_lowercase().contains(kw.as_str()))
            })
        })
        .collect()
}

/// File indices to keep, highest risk first. Ties keep diff order.
///
/// Files without changed lines (binary or mode-only) are ranked only when no
/// file has any.
fn risk_order(scores: &[i32], has_changes: &[bool], config: &SamplingConfig) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..scores.len()).filter(|&i| has_changes[i]).collect();
    if ranked.is_empty() {
        ranked = (0..scores.len()).collect();
    }
    ranked.sort_by(|&a, &b| scores[b].cmp(&scores[a]));

    let above: Vec<usize> = ranked
        .iter()
        .copied()
        .filter(|&i| scores[i] >= config.min_risk_score)
        .take(config.max_risk_files)
        .collect();
    if !above.is_empty() {
        return above;
    }
    log::debug!(
        "No file reached risk score {}; keeping top {}",
        config.min_risk_score,
        config.fallback_top_n
    );
    ranked.into_iter().take(config.fallback_top_n).collect()
}

enum KeptHunk<'a> {
    Whole(&'a DiffHunk),
    /// Leading lines up to the budget, then an omission marker.
    Partial { hunk: &'a DiffHunk, lines: usize },
}

impl KeptHunk<'_> {
    fn changed_lines(&self) -> usize {
        match self {
            Self::Whole(hunk) => hunk.changed_lines(),
            Self::Partial { hunk, lines } => hunk.lines[..*lines]
                .iter()
                .filter(|l| l.starts_with('+') || l.starts_with('-'))
                .count(),
        }
    }

    fn render(&self, out: &mut String) {
        let (hunk, lines) = match self {
            Self::Whole(hunk) => (*hunk, hunk.lines.len()),
            Self::Partial { hunk, lines } => (*hunk, *lines),
        };
        out.push_str(&hunk.header);
        out.push('\n');
        for line in &hunk.lines[..lines] {
            out.push_str(line);
            out.push('\n');
        }
        let omitted = hunk.lines.len() - lines;
        if omitted > 0 {
            out.push_str(&format!("... ({omitted} lines omitted)\n"));
        }
    }
}

/// Walk files in risk order, keeping whole hunks while the changed-line budget
/// lasts. The first hunk that does not fit is cut at the budget. Returns the
/// kept files in diff order and whether anything was cut.
fn spend_budget<'a>(
    files: &'a [FileDiff],
    order: &[usize],
    budget: usize,
) -> (Vec<(&'a FileDiff, Vec<KeptHunk<'a>>)>, bool) {
    let mut remaining = budget;
    let mut truncated = false;
    let mut kept: Vec<(usize, Vec<KeptHunk<'a>>)> = Vec::new();

    'files: for &idx in order {
        let file = &files[idx];
        let mut hunks = Vec::new();
        for hunk in &file.hunks {
            if remaining == 0 {
                truncated = true;
                if hunks.is_empty() && !file.hunks.is_empty() {
                    break 'files;
                }
                break;
            }
            let changed = hunk.changed_lines();
            if changed <= remaining {
                remaining -= changed;
                hunks.push(KeptHunk::Whole(hunk));
                continue;
            }
            let mut lines = 0;
            let mut used = 0;
            for line in &hunk.lines {
                let is_change = line.starts_with('+') || line.starts_with('-');
                if is_change && used == remaining {
                    break;
                }
                used += usize::from(is_change);
                lines += 1;
            }
            remaining = 0;
            truncated = true;
            hunks.push(KeptHunk::Partial { hunk, lines });
        }
        if !hunks.is_empty() || file.hunks.is_empty() {
            kept.push((idx, hunks));
        }
    }

    kept.sort_by_key(|(idx, _)| *idx);
    (
        kept.into_iter().map(|(idx, hunks)| (&files[idx], hunks)).collect(),
        truncated,
    )
}

/// Rebuild the sample from the kept hunks. A final newline is only written
/// when the input had one.
fn finish(
    sample: &mut SampledDiff,
    diff_text: &str,
    kept: &[(&FileDiff, Vec<KeptHunk<'_>>)],
    truncation: Option<BudgetTruncation>,
) {
    let mut text = String::new();
    for (file, hunks) in kept {
        for line in &file.header {
            text.push_str(line);
            text.push('\n');
        }
        for hunk in hunks {
            hunk.render(&mut text);
        }
    }
    if !diff_text.ends_with('\n') && text.ends_with('\n') {
        text.pop();
    }
    sample.selected_files = kept.iter().map(|(f, _)| f.path.clone()).collect();
    sample.sampled_changed_lines = kept
        .iter()
        .flat_map(|(_, hunks)| hunks.iter().map(KeptHunk::changed_lines))
        .sum();
    sample.truncation = truncation;
    sample.sampled_diff_text = text;
    log::debug!(
        "Sampled {} of {} changed lines from {} files ({:?})",
        sample.sampled_changed_lines,
        sample.total_changed_lines,
        sample.selected_files.len(),
        sample.strategy
    );
}
