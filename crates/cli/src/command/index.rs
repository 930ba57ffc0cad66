use anyhow::{Context as AnyhowContext, Result};
use ciscope_capture::{build_run_index, RunIndex, RunInfo};
use serde::Serialize;
use std::path::PathBuf;

use super::{emit, print_stdout};
use crate::{Context, IndexBuildArgs, IndexCommand};

#[derive(Serialize)]
struct BuildReport<'a> {
    path: PathBuf,
    run_id: &'a str,
    run_number: Option<u64>,
    jobs: usize,
    skipped: usize,
}

pub(crate) fn run(cmd: IndexCommand, ctx: &Context) -> Result<()> {
    match cmd {
        IndexCommand::Build(args) => build(args, ctx),
    }
}

fn build(args: IndexBuildArgs, ctx: &Context) -> Result<()> {
    let mut run = RunInfo::from_env();
    if let Some(run_id) = args.run_id {
        run.run_id = run_id;
    }
    if args.run_number.is_some() {
        run.run_number = args.run_number;
    }

    let index: RunIndex = build_run_index(&ctx.workspace, run)
        .with_context(|| format!("Failed to scan {}", ctx.workspace.display()))?;
    let path = index.save().context("Failed to write the run index")?;

    let report = BuildReport {
        path,
        run_id: &index.run_id,
        run_number: index.run_number,
        jobs: index.len(),
        skipped: index.skipped.len(),
    };
    emit(args.json, &report, |r| {
        format!(
            "Indexed {} job(s) for run {} ({} skipped) -> {}",
            r.jobs,
            r.run_id,
            r.skipped,
            r.path.display()
        )
    })?;
    if !args.json {
        for skipped in &index.skipped {
            print_stdout(&format!("  skipped {}: {}", skipped.folder, skipped.reason))?;
        }
    }
    Ok(())
}
