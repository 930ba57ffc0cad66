//! Capture subcommands run inside CI jobs. A capture failure must never fail
//! the job, so errors are logged and the process exits 0 (except `run`,
//! which exits with the wrapped command's code).

use anyhow::Result;
use ciscope_capture::layout::ci_results_dir;
use ciscope_capture::{
    initialize_capture, run_teed, CaptureHandle, Conclusion, LogSink, TeeSink, WriteSink,
};
use ciscope_protocol::env::non_empty_var;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::Command;

use crate::{CaptureCommand, Context, FinalizeArgs, JobArg, RunArgs};

const STEP_SUMMARY_ENV: &str = "GITHUB_STEP_SUMMARY";

/// Exit code when the wrapped command could not be spawned or died by signal.
const EXIT_SPAWN_FAILED: i32 = 127;

pub(crate) fn run(cmd: CaptureCommand, ctx: &Context) -> Result<()> {
    match cmd {
        CaptureCommand::Init(args) => init(args, ctx),
        CaptureCommand::Append(args) => append(args, ctx),
        CaptureCommand::Run(args) => run_command(args, ctx),
        CaptureCommand::Finalize(args) => finalize(args, ctx),
    }
    Ok(())
}

fn init(args: JobArg, ctx: &Context) {
    let results_dir = ci_results_dir(&ctx.workspace);
    match initialize_capture(&results_dir, &args.job) {
        Ok(handle) => println!("{}", handle.log_path().display()),
        Err(err) => log::warn!("Capture init for '{}' failed, continuing without it: {err}", args.job),
    }
}

/// Open the bundle, initializing it when an earlier step did not.
fn open_or_init(job: &str, ctx: &Context) -> Option<CaptureHandle> {
    let results_dir = ci_results_dir(&ctx.workspace);
    let opened = CaptureHandle::open(&results_dir, job).or_else(|err| match err {
        ciscope_capture::CaptureError::NotInitialized { .. } => {
            log::info!("No capture for '{job}' yet, initializing");
            initialize_capture(&results_dir, job)
        }
        other => Err(other),
    });
    match opened {
        Ok(handle) => Some(handle),
        Err(err) => {
            log::warn!("Capture for '{job}' unavailable, continuing without it: {err}");
            None
        }
    }
}

fn append(args: JobArg, ctx: &Context) {
    let stdin = io::stdin();
    let Some(mut handle) = open_or_init(&args.job, ctx) else {
        // Still pass the stream through so the step's output is not lost.
        let mut console = WriteSink::new(io::stdout().lock());
        pump(stdin.lock(), &mut console);
        return;
    };

    let console = WriteSink::new(io::stdout().lock());
    let mut tee = TeeSink::new(console, handle.sink());
    pump(stdin.lock(), &mut tee);
    if let Err(err) = tee.flush() {
        log::warn!("Failed to flush captured log for '{}': {err}", args.job);
    }
}

fn pump(mut input: impl BufRead, sink: &mut dyn LogSink) {
    let mut line = Vec::new();
    loop {
        line.clear();
        match input.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                if let Err(err) = sink.append(&line) {
                    log::warn!("Log capture failed, stopping: {err}");
                    break;
                }
            }
            Err(err) => {
                log::warn!("Failed to read stdin: {err}");
                break;
            }
        }
    }
}

fn run_command(args: RunArgs, ctx: &Context) {
    let Some((program, rest)) = args.command.split_first() else {
        return;
    };
    let mut command = Command::new(program);
    command.args(rest);

    let status = match open_or_init(&args.job, ctx) {
        Some(mut handle) => run_teed(&mut command, handle.sink(), !args.no_echo),
        None => {
            let mut discard: Vec<u8> = Vec::new();
            run_teed(&mut command, &mut discard, !args.no_echo)
        }
    };

    let code = match status {
        Ok(status) => status.code().unwrap_or(EXIT_SPAWN_FAILED),
        Err(err) => {
            log::error!("Failed to run {program}: {err}");
            EXIT_SPAWN_FAILED
        }
    };
    std::process::exit(code);
}

fn finalize(args: FinalizeArgs, ctx: &Context) {
    let conclusion: Conclusion = match args.conclusion.parse() {
        Ok(conclusion) => conclusion,
        Err(err) => {
            log::warn!("{err}; recording '{}' as failure", args.job);
            Conclusion::Failure
        }
    };
    let summary = args
        .summary
        .or_else(|| non_empty_var(STEP_SUMMARY_ENV).map(PathBuf::from));

    let Some(handle) = open_or_init(&args.job, ctx) else {
        return;
    };
    match handle.finalize(conclusion, summary.as_deref()) {
        Ok(bundle) => log::info!(
            "Bundle for '{}' ready: {} bytes, {} lines",
            bundle.job_name,
            bundle.size_bytes,
            bundle.line_count
        ),
        Err(err) => log::warn!("Capture finalize for '{}' failed: {err}", args.job),
    }
}
