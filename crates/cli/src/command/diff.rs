use anyhow::{anyhow, Context as AnyhowContext, Result};
use ciscope_diff::{
    identify_critical_paths, parse_commits_json, parse_diff, smart_diff_sample, summarize_commits,
    CommitSummary, FileSummary, SampledDiff, SamplingConfig,
};
use serde::Serialize;
use std::fmt::Write as _;

use super::{emit, read_input};
use crate::{CommitsArgs, Context, DiffCommand, DiffSampleArgs, DiffSummaryArgs};

pub(crate) fn run(cmd: DiffCommand, ctx: &Context) -> Result<()> {
    match cmd {
        DiffCommand::Sample(args) => sample(args, ctx),
        DiffCommand::Summary(args) => summary(args),
        DiffCommand::Commits(args) => commits(args),
    }
}

fn sampling_config(args: &DiffSampleArgs, ctx: &Context) -> Result<SamplingConfig> {
    let mut config = ctx.config.sampling.clone();
    if let Some(value) = args.small_threshold {
        config.small_threshold = value;
    }
    if let Some(value) = args.medium_threshold {
        config.medium_threshold = value;
    }
    if let Some(value) = args.max_changed_lines {
        config.max_sampled_changed_lines = value;
    }
    config
        .validate()
        .map_err(|err| anyhow!("Invalid sampling config: {err}"))?;
    Ok(config)
}

fn sample(args: DiffSampleArgs, ctx: &Context) -> Result<()> {
    let config = sampling_config(&args, ctx)?;
    let diff_text = read_input(&args.diff)?;

    let mut messages = args.messages.clone();
    if let Some(path) = &args.commits {
        let raw = read_input(path)?;
        let commits = parse_commits_json(&raw)
            .with_context(|| format!("Invalid commit list {}", path.display()))?;
        messages.extend(commits.into_iter().map(|c| c.message));
    }

    let sample = smart_diff_sample(&diff_text, &messages, &config);
    emit(args.json, &sample, render_sample)
}

fn render_sample(sample: &SampledDiff) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "# Diff sample: {:?} tier, {:?} ({} of {} changed lines)",
        sample.tier, sample.strategy, sample.sampled_changed_lines, sample.total_changed_lines
    );
    if !sample.commit_intent_keywords.is_empty() {
        let _ = writeln!(out, "Intent keywords: {}", sample.commit_intent_keywords.join(", "));
    }
    if !sample.review_focus_areas.is_empty() {
        let areas: Vec<&str> = sample.review_focus_areas.iter().map(|a| a.as_str()).collect();
        let _ = writeln!(out, "Focus areas: {}", areas.join(", "));
    }
    if sample.truncation.is_some() {
        let _ = writeln!(out, "Sample truncated at the changed-line budget.");
    }
    out.push('\n');
    out.push_str(&sample.sampled_diff_text);
    out
}

#[derive(Serialize)]
struct DiffOverview {
    files: Vec<FileSummary>,
    total_changed_lines: usize,
    critical_paths: Vec<String>,
}

fn summary(args: DiffSummaryArgs) -> Result<()> {
    let diff_text = read_input(&args.diff)?;
    let parsed = parse_diff(&diff_text);
    let overview = DiffOverview {
        files: parsed
            .files
            .iter()
            .map(|f| FileSummary {
                path: f.path.clone(),
                additions: f.additions(),
                deletions: f.deletions(),
            })
            .collect(),
        total_changed_lines: parsed.total_changed_lines(),
        critical_paths: identify_critical_paths(&parsed.files, args.top),
    };
    emit(args.json, &overview, |o| {
        let mut out = format!("{} files, {} changed lines\n", o.files.len(), o.total_changed_lines);
        for file in &o.files {
            let _ = writeln!(out, "  +{:<5} -{:<5} {}", file.additions, file.deletions, file.path);
        }
        if !o.critical_paths.is_empty() {
            let _ = writeln!(out, "Critical paths:");
            for path in &o.critical_paths {
                let _ = writeln!(out, "  {path}");
            }
        }
        out
    })
}

fn commits(args: CommitsArgs) -> Result<()> {
    let raw = read_input(&args.commits)?;
    let commits = parse_commits_json(&raw)
        .with_context(|| format!("Invalid commit list {}", args.commits.display()))?;
    let summary: CommitSummary = summarize_commits(&commits);
    emit(args.json, &summary, |s| {
        let mut out = format!("{}\n", s.summary);
        for message in &s.sample_messages {
            let _ = writeln!(out, "  - {message}");
        }
        out
    })
}
