use ciscope_capture::layout::{ci_results_dir, job_index_path};
use ciscope_capture::{build_run_index, initialize_capture, Conclusion, RunIndex, RunInfo};
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;

fn finalize_job(workspace: &Path, job: &str, conclusion: Conclusion, body: &str) {
    let mut handle = initialize_capture(&ci_results_dir(workspace), job).expect("initialize");
    handle.append(body.as_bytes()).expect("append");
    handle.finalize(conclusion, None).expect("finalize");
}

#[test]
fn index_contains_exactly_the_bundles_that_published() {
    let temp = TempDir::new().expect("tempdir");
    let ws = temp.path();
    finalize_job(ws, "lint", Conclusion::Success, "clippy clean\n");
    finalize_job(ws, "tests", Conclusion::Failure, "test foo ... FAILED\n");
    finalize_job(ws, "docs", Conclusion::Skipped, "");
    // The fourth job never uploaded anything.

    let index = build_run_index(ws, RunInfo::new("1234")).expect("index");
    assert_eq!(index.len(), 3);
    assert!(index.skipped.is_empty());
    let mut names = index.job_names();
    names.sort();
    assert_eq!(names, vec!["docs", "lint", "tests"]);
}

#[test]
fn cancelled_core_ci_is_simply_absent() {
    let temp = TempDir::new().expect("tempdir");
    let ws = temp.path();
    finalize_job(ws, "lint", Conclusion::Success, "ok\n");
    finalize_job(ws, "security", Conclusion::Success, "ok\n");
    finalize_job(ws, "e2e", Conclusion::Failure, "boom\n");

    // core-ci was cancelled before finalize: only the placeholder exists.
    drop(initialize_capture(&ci_results_dir(ws), "core-ci").expect("initialize"));

    let index = build_run_index(ws, RunInfo::new("99")).expect("index");
    assert_eq!(index.len(), 3);
    assert!(index.get("core-ci").is_none());
    assert_eq!(index.skipped.len(), 1);
    assert_eq!(index.skipped[0].folder, "core-ci");
}

#[test]
fn corrupt_metadata_skips_only_that_bundle() {
    let temp = TempDir::new().expect("tempdir");
    let ws = temp.path();
    finalize_job(ws, "lint", Conclusion::Success, "ok\n");
    finalize_job(ws, "tests", Conclusion::Failure, "bad\n");
    std::fs::write(
        ci_results_dir(ws).join("tests").join("metadata.json"),
        "{ truncated",
    )
    .expect("corrupt metadata");
    std::fs::create_dir_all(ci_results_dir(ws).join("stray")).expect("stray dir");

    let index = build_run_index(ws, RunInfo::new("7")).expect("index");
    assert_eq!(index.job_names(), vec!["lint"]);
    let skipped: Vec<&str> = index.skipped.iter().map(|s| s.folder.as_str()).collect();
    assert_eq!(skipped, vec!["stray", "tests"]);
}

#[test]
fn saved_index_round_trips_through_job_index_json() {
    let temp = TempDir::new().expect("tempdir");
    let ws = temp.path();
    finalize_job(ws, "lint", Conclusion::Success, "one\ntwo\n");
    std::fs::write(ci_results_dir(ws).join("lint").join("summary.md"), "all good\n")
        .expect("summary");

    let built = build_run_index(
        ws,
        RunInfo {
            run_id: "555".to_string(),
            run_number: Some(12),
        },
    )
    .expect("index");
    let path = built.save().expect("save");
    assert_eq!(path, job_index_path(ws));

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
    assert_eq!(raw["run_id"], "555");
    let entry = &raw["jobs"][0];
    assert_eq!(entry["job_name"], "lint");
    assert_eq!(entry["conclusion"], "success");
    assert_eq!(entry["folder"], "lint");
    assert_eq!(entry["line_count"], 4);
    assert!(entry["timestamp"].is_string());

    let loaded = RunIndex::load(ws).expect("load").expect("index present");
    assert_eq!(loaded.run_number, Some(12));
    let lint = loaded.get("lint").expect("lint");
    assert_eq!(lint.size_bytes, built.bundles[0].size_bytes);
    assert!(lint.has_summary());
}

#[test]
fn load_or_build_scans_when_no_index_was_saved() {
    let temp = TempDir::new().expect("tempdir");
    let ws = temp.path();
    finalize_job(ws, "build", Conclusion::Cancelled, "interrupted\n");

    let index = RunIndex::load_or_build(ws, RunInfo::new("local")).expect("index");
    assert_eq!(index.len(), 1);
    assert_eq!(index.bundles[0].conclusion, Conclusion::Cancelled);
}
