use chrono::Utc;
use ciscope_capture::layout::{ci_results_dir, BundlePaths};
use ciscope_capture::{build_run_index, BundleMetadata, Conclusion, RunIndex, RunInfo};
use ciscope_inspect::render::{render_index, render_search};
use ciscope_inspect::{
    InspectConfig, InspectError, Inspector, SearchOptions, SizeClass, NO_SUMMARY,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;

/// Publish a finalized bundle whose log is exactly `log`.
fn publish(workspace: &Path, job: &str, conclusion: Conclusion, log: &[u8]) {
    let paths = BundlePaths::new(ci_results_dir(workspace).join(job));
    std::fs::create_dir_all(&paths.dir).expect("bundle dir");
    std::fs::write(&paths.log, log).expect("log");
    let line_count = log.iter().filter(|&&b| b == b'\n').count() as u64;
    BundleMetadata {
        job_name: job.to_string(),
        conclusion: Some(conclusion),
        size_bytes: log.len() as u64,
        line_count,
        created_at: Utc::now(),
        finalized_at: Some(Utc::now()),
    }
    .write(&paths.metadata)
    .expect("metadata");
}

fn log_of_size(size: usize) -> Vec<u8> {
    let line = b"building crate ciscope ok\n";
    let mut out = Vec::with_capacity(size);
    while out.len() + line.len() <= size {
        out.extend_from_slice(line);
    }
    out.resize(size, b'.');
    out
}

fn index(workspace: &Path) -> RunIndex {
    build_run_index(workspace, RunInfo::new("test-run")).expect("index")
}

#[test]
fn forty_nine_kb_log_is_small_and_safe() {
    let temp = TempDir::new().expect("tempdir");
    publish(temp.path(), "lint", Conclusion::Success, &log_of_size(49_000));
    let index = index(temp.path());
    let config = InspectConfig::default();
    let inspector = Inspector::new(&index, &config);

    let report = inspector.check_size(inspector.bundle("lint").expect("bundle"));
    assert_eq!(report.classification, SizeClass::Small);
    assert!(report.recommendation.contains("safe to read fully"));
}

#[test]
fn classification_boundaries_hold_for_published_bundles() {
    let temp = TempDir::new().expect("tempdir");
    for (job, size) in [("a", 49_999), ("b", 50_000), ("c", 200_000), ("d", 200_001)] {
        publish(temp.path(), job, Conclusion::Success, &log_of_size(size));
    }
    let index = index(temp.path());
    let config = InspectConfig::default();
    let inspector = Inspector::new(&index, &config);

    let classes: Vec<SizeClass> = ["a", "b", "c", "d"]
        .iter()
        .map(|job| inspector.check_size(inspector.bundle(job).expect("bundle")).classification)
        .collect();
    assert_eq!(
        classes,
        vec![SizeClass::Small, SizeClass::Medium, SizeClass::Medium, SizeClass::Large]
    );
}

#[test]
fn large_log_full_read_is_refused_without_max_lines() {
    let temp = TempDir::new().expect("tempdir");
    publish(temp.path(), "core-ci", Conclusion::Failure, &log_of_size(250_000));
    let index = index(temp.path());
    let config = InspectConfig::default();
    let inspector = Inspector::new(&index, &config);
    let bundle = inspector.bundle("core-ci").expect("bundle");

    let err = inspector.read_full(bundle, None).unwrap_err();
    assert!(matches!(err, InspectError::SizeLimitExceeded { size_bytes: 250_000, .. }));
    let message = err.to_string();
    assert!(message.contains("250"));
    assert!(message.contains("search"));
    assert!(message.contains("get_stats"));

    let bounded = inspector.read_full(bundle, Some(500)).expect("bounded read");
    assert_eq!(bounded.lines_returned, 500);
    assert_eq!(bounded.content.lines().count(), 500);
    assert!(bounded.truncated);
}

#[test]
fn refusal_holds_for_every_large_size() {
    let temp = TempDir::new().expect("tempdir");
    for (job, size) in [("x", 200_001), ("y", 300_000), ("z", 1_000_000)] {
        publish(temp.path(), job, Conclusion::Failure, &log_of_size(size));
    }
    let index = index(temp.path());
    let config = InspectConfig::default();
    let inspector = Inspector::new(&index, &config);
    for bundle in index.iter() {
        assert!(matches!(
            inspector.read_full(bundle, None),
            Err(InspectError::SizeLimitExceeded { .. })
        ));
    }
}

#[test]
fn medium_and_small_logs_read_whole() {
    let temp = TempDir::new().expect("tempdir");
    publish(temp.path(), "docs", Conclusion::Success, b"one\ntwo\nthree\n");
    let index = index(temp.path());
    let config = InspectConfig::default();
    let inspector = Inspector::new(&index, &config);

    let full = inspector
        .read_full(inspector.bundle("docs").expect("bundle"), None)
        .expect("read");
    assert_eq!(full.content, "one\ntwo\nthree\n");
    assert_eq!(full.lines_returned, 3);
    assert!(!full.truncated);

    let capped = inspector
        .read_full(inspector.bundle("docs").expect("bundle"), Some(10))
        .expect("read");
    assert!(!capped.truncated);
    assert_eq!(capped.lines_returned, 3);
}

fn forty_errors_log() -> Vec<u8> {
    let mut log = String::new();
    for i in 1..=40 {
        log.push_str(&format!("step {i} preparing\n"));
        log.push_str(&format!("step {i} running\n"));
        log.push_str(&format!("step {i} still running\n"));
        log.push_str(&format!("error: step {i} broke\n"));
        log.push_str(&format!("step {i} cleanup a\n"));
        log.push_str(&format!("step {i} cleanup b\n"));
        log.push_str(&format!("step {i} cleanup c\n"));
    }
    log.into_bytes()
}

#[test]
fn search_returns_exactly_five_matches_with_context() {
    let temp = TempDir::new().expect("tempdir");
    publish(temp.path(), "tests", Conclusion::Failure, &forty_errors_log());
    let index = index(temp.path());
    let config = InspectConfig::default();
    let inspector = Inspector::new(&index, &config);

    let result = inspector
        .search(
            inspector.bundle("tests").expect("bundle"),
            "error",
            &SearchOptions {
                max_matches: Some(5),
                ..Default::default()
            },
        )
        .expect("search");
    assert_eq!(result.matches.len(), 5);
    assert!(result.hit_match_limit);
    for m in &result.matches {
        assert_eq!(m.before.len(), 3);
        assert_eq!(m.after.len(), 3);
        assert!(m.line.starts_with("error:"));
    }
    assert_eq!(result.matches[0].line_number, 4);
    assert_eq!(result.matches[0].before[0], "step 1 preparing");
    assert_eq!(result.matches[0].after[2], "step 1 cleanup c");

    let rendered = render_search(&result);
    assert!(rendered.contains("Match 5"));
    assert!(!rendered.contains("Match 6"));
}

#[test]
fn search_never_exceeds_max_matches() {
    let temp = TempDir::new().expect("tempdir");
    publish(temp.path(), "tests", Conclusion::Failure, &forty_errors_log());
    let index = index(temp.path());
    let config = InspectConfig::default();
    let inspector = Inspector::new(&index, &config);
    let bundle = inspector.bundle("tests").expect("bundle");

    for cap in [1usize, 2, 7, 39, 40, 41, 100] {
        let result = inspector
            .search(
                bundle,
                "ERROR",
                &SearchOptions {
                    max_matches: Some(cap),
                    ..Default::default()
                },
            )
            .expect("search");
        assert!(result.matches.len() <= cap);
        assert_eq!(result.matches.len(), cap.min(40));
    }
}

#[test]
fn zero_max_matches_returns_nothing() {
    let temp = TempDir::new().expect("tempdir");
    publish(temp.path(), "tests", Conclusion::Failure, &forty_errors_log());
    let index = index(temp.path());
    let config = InspectConfig::default();
    let inspector = Inspector::new(&index, &config);
    let bundle = inspector.bundle("tests").expect("bundle");

    let result = inspector
        .search(
            bundle,
            "error",
            &SearchOptions {
                max_matches: Some(0),
                ..Default::default()
            },
        )
        .expect("search");
    assert!(result.matches.is_empty());
    assert_eq!(result.max_matches, 0);
    assert!(result.hit_match_limit);
}

#[test]
fn case_sensitive_and_literal_search() {
    let temp = TempDir::new().expect("tempdir");
    publish(
        temp.path(),
        "build",
        Conclusion::Failure,
        b"Error: one\nerror: two\nvalue a.b(c)\nvalue axb(c)\n",
    );
    let index = index(temp.path());
    let config = InspectConfig::default();
    let inspector = Inspector::new(&index, &config);
    let bundle = inspector.bundle("build").expect("bundle");

    let sensitive = inspector
        .search(
            bundle,
            "error",
            &SearchOptions {
                case_sensitive: true,
                context_lines: Some(0),
                ..Default::default()
            },
        )
        .expect("search");
    assert_eq!(sensitive.matches.len(), 1);
    assert_eq!(sensitive.matches[0].line_number, 2);

    let literal = inspector
        .search(
            bundle,
            "a.b(",
            &SearchOptions {
                literal: true,
                ..Default::default()
            },
        )
        .expect("search");
    assert_eq!(literal.matches.len(), 1);
    assert_eq!(literal.matches[0].line, "value a.b(c)");

    assert!(matches!(
        inspector.search(bundle, "a.b(", &SearchOptions::default()),
        Err(InspectError::InvalidPattern { .. })
    ));
}

#[test]
fn stats_count_default_patterns() {
    let temp = TempDir::new().expect("tempdir");
    publish(
        temp.path(),
        "tests",
        Conclusion::Failure,
        b"compiling\nwarning: unused import\ntest a ... FAILED\nerror: test failed\nthread panicked with exception\n",
    );
    let index = index(temp.path());
    let config = InspectConfig::default();
    let inspector = Inspector::new(&index, &config);

    let stats = inspector
        .get_stats(inspector.bundle("tests").expect("bundle"))
        .expect("stats");
    assert_eq!(stats.line_count, 5);
    assert_eq!(stats.error_count(), 1);
    assert_eq!(stats.warning_count(), 1);
    assert_eq!(stats.failed_count(), 1);
    assert_eq!(stats.exception_count(), 1);
    assert_eq!(
        stats.recommendation,
        ciscope_inspect::StatsRecommendation::Investigate
    );
}

#[test]
fn summary_is_optional() {
    let temp = TempDir::new().expect("tempdir");
    publish(temp.path(), "lint", Conclusion::Success, b"ok\n");
    publish(temp.path(), "tests", Conclusion::Failure, b"bad\n");
    std::fs::write(
        ci_results_dir(temp.path()).join("tests").join("summary.md"),
        "## 2 tests failed\n",
    )
    .expect("summary");
    let index = index(temp.path());
    let config = InspectConfig::default();
    let inspector = Inspector::new(&index, &config);

    let missing = inspector.read_summary(inspector.bundle("lint").expect("bundle"));
    assert_eq!(missing.text(), NO_SUMMARY);
    let present = inspector.read_summary(inspector.bundle("tests").expect("bundle"));
    assert_eq!(present.text(), "## 2 tests failed\n");
}

#[test]
fn index_overview_lists_only_published_jobs() {
    let temp = TempDir::new().expect("tempdir");
    publish(temp.path(), "lint", Conclusion::Success, b"ok\n");
    publish(temp.path(), "security", Conclusion::Success, b"ok\n");
    publish(temp.path(), "e2e", Conclusion::Failure, b"boom\n");
    let index = index(temp.path());
    let config = InspectConfig::default();
    let inspector = Inspector::new(&index, &config);

    let overview = inspector.read_index();
    assert_eq!(overview.jobs.len(), 3);
    let rendered = render_index(&overview);
    for job in ["lint", "security", "e2e"] {
        assert!(rendered.contains(&format!("**{job}**")));
    }
    assert!(!rendered.contains("core-ci"));

    let err = inspector.bundle("core-ci").unwrap_err();
    assert!(matches!(err, InspectError::JobNotFound { .. }));
}
