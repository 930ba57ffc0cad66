//! Markdown renderings of inspection results, sized for an agent's context.

use ciscope_capture::Conclusion;
use std::fmt::Write as _;

use crate::search::SearchResult;
use crate::size::format_kb;
use crate::stats::LogStats;
use crate::toolkit::{FullLog, IndexOverview, JobSummary, Operation, SizeReport};

fn status_marker(conclusion: Conclusion) -> &'static str {
    match conclusion {
        Conclusion::Success => "[ok]",
        Conclusion::Failure => "[FAIL]",
        Conclusion::Cancelled | Conclusion::Skipped => "[--]",
    }
}

pub fn render_index(overview: &IndexOverview) -> String {
    let mut out = String::from("# CI Job Index\n\n");
    let run_number = overview
        .run_number
        .map(|n| format!(" (#{n})"))
        .unwrap_or_default();
    let _ = writeln!(out, "**Run:** {}{run_number}\n", overview.run_id);
    let _ = writeln!(out, "## Jobs ({} with bundles)\n", overview.jobs.len());

    if overview.jobs.is_empty() {
        out.push_str("No job bundles were published for this run.\n");
    }
    for job in &overview.jobs {
        let _ = writeln!(
            out,
            "{} **{}** ({})",
            status_marker(job.conclusion),
            job.job_name,
            job.conclusion
        );
        let _ = writeln!(out, "   - Folder: `{}`", job.folder);
        let _ = writeln!(
            out,
            "   - Log: {} KB, {} lines ({}: {})",
            format_kb(job.size_bytes),
            job.line_count,
            job.size_class,
            job.size_class.recommendation()
        );
        let _ = writeln!(
            out,
            "   - Summary: {}",
            if job.has_summary { "yes" } else { "no" }
        );
        let _ = writeln!(out, "   - Timestamp: {}\n", job.timestamp.to_rfc3339());
    }

    if !overview.skipped.is_empty() {
        let _ = writeln!(out, "## Ignored folders ({})\n", overview.skipped.len());
        for skipped in &overview.skipped {
            let _ = writeln!(out, "- `{}`: {}", skipped.folder, skipped.reason);
        }
    }
    out
}

pub fn render_size(report: &SizeReport) -> String {
    format!(
        "# Log Size: {}\n\n**Size:** {} bytes ({} KB)\n**Lines:** {}\n**Class:** {}\n\n**Recommendation:** {}\n",
        report.job_name,
        report.size_bytes,
        format_kb(report.size_bytes),
        report.line_count,
        report.classification,
        report.recommendation
    )
}

pub fn render_summary(summary: &JobSummary) -> String {
    format!("# Summary: {}\n\n{}\n", summary.job_name, summary.text())
}

pub fn render_stats(stats: &LogStats) -> String {
    let mut out = format!("# Log Statistics: {}\n\n", stats.job_name);
    let _ = writeln!(out, "**Total lines:** {}", stats.line_count);
    let _ = writeln!(out, "**File size:** {} KB\n", format_kb(stats.size_bytes));
    out.push_str("## Pattern Counts\n\n");
    for count in &stats.counts {
        let _ = writeln!(out, "- **{}:** {}", count.label, count.count);
    }
    let _ = writeln!(
        out,
        "\n**Recommendation:** {}",
        stats.recommendation.message()
    );
    out
}

pub fn render_search(result: &SearchResult) -> String {
    if result.matches.is_empty() {
        return format!(
            "No matches for pattern '{}' in {}\n",
            result.pattern, result.job_name
        );
    }

    let mut out = format!(
        "# Search Results for '{}' in {}\n\n**{} matches** (cap {}, {} context lines)\n\n",
        result.pattern,
        result.job_name,
        result.matches.len(),
        result.max_matches,
        result.context_lines
    );
    for (n, m) in result.matches.iter().enumerate() {
        let _ = writeln!(out, "## Match {} (line {})", n + 1, m.line_number);
        out.push_str("```\n");
        let mut line_no = m.first_line_number();
        for text in m.before.iter().chain(std::iter::once(&m.line)).chain(&m.after) {
            let marker = if line_no == m.line_number { '>' } else { ' ' };
            let _ = writeln!(out, "{marker}{line_no:>6} | {text}");
            line_no += 1;
        }
        out.push_str("```\n\n");
    }
    if result.hit_match_limit {
        let _ = writeln!(
            out,
            "Reached the maximum of {} matches. The pattern may occur more times.",
            result.max_matches
        );
    }
    out
}

pub fn render_full(log: &FullLog) -> String {
    let mut out = format!("# Full Log: {}\n\n", log.job_name);
    if log.truncated {
        let _ = writeln!(
            out,
            "Truncated to {} lines (log is {} KB).\n",
            log.lines_returned,
            format_kb(log.size_bytes)
        );
    } else {
        let _ = writeln!(out, "**Size:** {} KB\n", format_kb(log.size_bytes));
    }
    out.push_str("```\n");
    out.push_str(&log.content);
    if !log.content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("```\n");
    if log.truncated {
        out.push_str("\nUse search to find specific patterns past this point.\n");
    }
    out
}

/// Operations with their declared cost, for `--help`-style listings.
pub fn render_operations() -> String {
    let mut out = String::from("| operation | cost | purpose |\n|---|---|---|\n");
    for op in Operation::ALL {
        let _ = writeln!(out, "| `{}` | {} | {} |", op.name(), op.cost(), op.description());
    }
    out
}
