use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod command;
mod config;

pub use config::{resolve_workspace, AppConfig};

#[derive(Parser)]
#[command(name = "ciscope")]
#[command(about = "Capture CI job logs and inspect them within a context budget", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace holding `ci_results/` (defaults to CISCOPE_WORKSPACE, then the current directory)
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// JSON config file (overrides CISCOPE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a job's console output into its bundle (used from CI steps)
    #[command(subcommand)]
    Capture(CaptureCommand),

    /// Assemble the run index from finalized bundles
    #[command(subcommand)]
    Index(IndexCommand),

    /// Size-aware access to captured logs
    #[command(subcommand)]
    Inspect(InspectCommand),

    /// Bounded review input from unified diffs and commit history
    #[command(subcommand)]
    Diff(DiffCommand),
}

#[derive(Subcommand)]
pub(crate) enum CaptureCommand {
    /// Create an empty bundle for a job
    Init(JobArg),

    /// Append stdin to the job log, echoing it to stdout
    Append(JobArg),

    /// Run a command, teeing its output into the job log; exits with the command's code
    Run(RunArgs),

    /// Measure the log, copy the summary and write final metadata
    Finalize(FinalizeArgs),
}

#[derive(Args)]
pub(crate) struct JobArg {
    /// Job name as reported by the CI platform
    #[arg(long)]
    pub job: String,
}

#[derive(Args)]
pub(crate) struct RunArgs {
    #[arg(long)]
    pub job: String,

    /// Do not echo the command's output to the console
    #[arg(long)]
    pub no_echo: bool,

    /// Command and arguments
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Args)]
pub(crate) struct FinalizeArgs {
    #[arg(long)]
    pub job: String,

    /// success | failure | cancelled | skipped
    #[arg(long)]
    pub conclusion: String,

    /// Summary file to copy into the bundle (defaults to GITHUB_STEP_SUMMARY)
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum IndexCommand {
    /// Scan bundle metadata and write `_job_index.json`
    Build(IndexBuildArgs),
}

#[derive(Args)]
pub(crate) struct IndexBuildArgs {
    /// Run id (defaults to GITHUB_RUN_ID, then "local")
    #[arg(long)]
    pub run_id: Option<String>,

    /// Run number (defaults to GITHUB_RUN_NUMBER)
    #[arg(long)]
    pub run_number: Option<u64>,

    /// Output JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub(crate) enum InspectCommand {
    /// List every job with conclusion, size and summary availability (cheap)
    Index(OutputArgs),

    /// Size class and reading recommendation for one job (cheap)
    Size(JobOutputArgs),

    /// Job summary, or a sentinel when none was captured (cheap)
    Summary(JobOutputArgs),

    /// Error/warning/failure/exception counts in one pass (medium)
    Stats(JobOutputArgs),

    /// Matching lines with context windows (medium)
    Search(SearchArgs),

    /// Whole log, refused for large logs unless --max-lines is given (expensive)
    Read(ReadArgs),

    /// List the inspection operations with their cost class
    Operations(OutputArgs),
}

#[derive(Args)]
pub(crate) struct OutputArgs {
    /// Output JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub(crate) struct ThresholdArgs {
    /// Logs below this many bytes are small
    #[arg(long)]
    pub small_bytes: Option<u64>,

    /// Logs above this many bytes are large
    #[arg(long)]
    pub large_bytes: Option<u64>,
}

#[derive(Args)]
pub(crate) struct JobOutputArgs {
    #[arg(long)]
    pub job: String,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub(crate) struct SearchArgs {
    #[arg(long)]
    pub job: String,

    /// Regular expression (or plain text with --literal)
    #[arg(long)]
    pub pattern: String,

    /// Lines of context before and after each match
    #[arg(long, short = 'C')]
    pub context: Option<usize>,

    /// Stop after this many matches
    #[arg(long, short = 'n')]
    pub max_matches: Option<usize>,

    #[arg(long)]
    pub case_sensitive: bool,

    /// Treat the pattern as plain text
    #[arg(long)]
    pub literal: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub(crate) struct ReadArgs {
    #[arg(long)]
    pub job: String,

    /// Read at most this many lines (required for large logs)
    #[arg(long)]
    pub max_lines: Option<usize>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub(crate) enum DiffCommand {
    /// Reduce a unified diff to a bounded, risk-aware sample
    Sample(DiffSampleArgs),

    /// Per-file change counts and the riskiest paths
    Summary(DiffSummaryArgs),

    /// Condense a commit list (JSON array) into counts and samples
    Commits(CommitsArgs),
}

#[derive(Args)]
pub(crate) struct DiffSampleArgs {
    /// Unified diff file, or `-` for stdin
    #[arg(long, default_value = "-")]
    pub diff: PathBuf,

    /// Commit list as a JSON array of {sha, message, author, date}
    #[arg(long)]
    pub commits: Option<PathBuf>,

    /// Commit message (repeatable)
    #[arg(long = "message", short = 'm')]
    pub messages: Vec<String>,

    /// Diffs with fewer changed lines pass through untouched
    #[arg(long)]
    pub small_threshold: Option<usize>,

    /// Diffs with at least this many changed lines are risk-sampled
    #[arg(long)]
    pub medium_threshold: Option<usize>,

    /// Changed-line budget of a risk-ranked sample
    #[arg(long)]
    pub max_changed_lines: Option<usize>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub(crate) struct DiffSummaryArgs {
    /// Unified diff file, or `-` for stdin
    #[arg(long, default_value = "-")]
    pub diff: PathBuf,

    /// How many risky paths to list
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub(crate) struct CommitsArgs {
    /// Commit list as a JSON array, or `-` for stdin
    #[arg(long, default_value = "-")]
    pub commits: PathBuf,

    #[arg(long)]
    pub json: bool,
}

/// Settings every subcommand shares.
pub(crate) struct Context {
    pub workspace: PathBuf,
    pub config: AppConfig,
}

pub fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // stdout carries the result, keep it free of log noise in JSON mode
    if command_wants_json(&cli.command) {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    // capture never fails the job; a broken config falls back to defaults
    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) if matches!(cli.command, Commands::Capture(_)) => {
            log::warn!("{err:#}; capturing with default settings");
            AppConfig::default()
        }
        Err(err) => return Err(err),
    };
    let ctx = Context {
        workspace: resolve_workspace(cli.workspace.as_deref()),
        config,
    };
    log::debug!("Workspace: {}", ctx.workspace.display());

    match cli.command {
        Commands::Capture(cmd) => command::capture::run(cmd, &ctx),
        Commands::Index(cmd) => command::index::run(cmd, &ctx),
        Commands::Inspect(cmd) => command::inspect::run(cmd, &ctx),
        Commands::Diff(cmd) => command::diff::run(cmd, &ctx),
    }
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Capture(_) => false,
        Commands::Index(IndexCommand::Build(args)) => args.json,
        Commands::Inspect(cmd) => match cmd {
            InspectCommand::Index(args) | InspectCommand::Operations(args) => args.json,
            InspectCommand::Size(args)
            | InspectCommand::Summary(args)
            | InspectCommand::Stats(args) => args.json,
            InspectCommand::Search(args) => args.json,
            InspectCommand::Read(args) => args.json,
        },
        Commands::Diff(cmd) => match cmd {
            DiffCommand::Sample(args) => args.json,
            DiffCommand::Summary(args) => args.json,
            DiffCommand::Commits(args) => args.json,
        },
    }
}
