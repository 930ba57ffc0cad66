use anyhow::{anyhow, Context as AnyhowContext, Result};
use ciscope_capture::{RunIndex, RunInfo};
use ciscope_inspect::render::{
    render_full, render_index, render_operations, render_search, render_size, render_stats,
    render_summary,
};
use ciscope_inspect::{InspectConfig, Inspector, Operation, SearchOptions};
use serde::Serialize;

use super::{emit, report_inspect_error};
use crate::{Context, InspectCommand, ThresholdArgs};

#[derive(Serialize)]
struct OperationInfo {
    name: &'static str,
    cost: ciscope_protocol::CostClass,
    description: &'static str,
}

fn inspect_config(ctx: &Context, flags: Option<&ThresholdArgs>) -> Result<InspectConfig> {
    let mut config = ctx.config.inspect.clone();
    if let Some(flags) = flags {
        if let Some(small) = flags.small_bytes {
            config.thresholds.small_bytes = small;
        }
        if let Some(large) = flags.large_bytes {
            config.thresholds.large_bytes = large;
        }
    }
    config
        .validate()
        .map_err(|err| anyhow!("Invalid inspect config: {err}"))?;
    Ok(config)
}

fn load_index(ctx: &Context) -> Result<RunIndex> {
    RunIndex::load_or_build(&ctx.workspace, RunInfo::from_env())
        .with_context(|| format!("Failed to load the run index in {}", ctx.workspace.display()))
}

pub(crate) fn run(cmd: InspectCommand, ctx: &Context) -> Result<()> {
    match cmd {
        InspectCommand::Operations(args) => {
            let ops: Vec<OperationInfo> = Operation::ALL
                .iter()
                .map(|op| OperationInfo {
                    name: op.name(),
                    cost: op.cost(),
                    description: op.description(),
                })
                .collect();
            emit(args.json, &ops, |_| render_operations())
        }
        InspectCommand::Index(args) => {
            let (index, config) = (load_index(ctx)?, inspect_config(ctx, None)?);
            let inspector = Inspector::new(&index, &config);
            emit(args.json, &inspector.read_index(), render_index)
        }
        InspectCommand::Size(args) => {
            let (index, config) = (load_index(ctx)?, inspect_config(ctx, Some(&args.thresholds))?);
            let inspector = Inspector::new(&index, &config);
            match inspector.bundle(&args.job) {
                Ok(bundle) => emit(args.json, &inspector.check_size(bundle), render_size),
                Err(err) => report_inspect_error(args.json, &err),
            }
        }
        InspectCommand::Summary(args) => {
            let (index, config) = (load_index(ctx)?, inspect_config(ctx, Some(&args.thresholds))?);
            let inspector = Inspector::new(&index, &config);
            match inspector.bundle(&args.job) {
                Ok(bundle) => emit(args.json, &inspector.read_summary(bundle), render_summary),
                Err(err) => report_inspect_error(args.json, &err),
            }
        }
        InspectCommand::Stats(args) => {
            let (index, config) = (load_index(ctx)?, inspect_config(ctx, Some(&args.thresholds))?);
            let inspector = Inspector::new(&index, &config);
            let stats = inspector
                .bundle(&args.job)
                .and_then(|bundle| inspector.get_stats(bundle));
            match stats {
                Ok(stats) => emit(args.json, &stats, render_stats),
                Err(err) => report_inspect_error(args.json, &err),
            }
        }
        InspectCommand::Search(args) => {
            let (index, config) = (load_index(ctx)?, inspect_config(ctx, None)?);
            let inspector = Inspector::new(&index, &config);
            let options = SearchOptions {
                context_lines: args.context,
                max_matches: args.max_matches,
                case_sensitive: args.case_sensitive,
                literal: args.literal,
            };
            let result = inspector
                .bundle(&args.job)
                .and_then(|bundle| inspector.search(bundle, &args.pattern, &options));
            match result {
                Ok(result) => emit(args.json, &result, render_search),
                Err(err) => report_inspect_error(args.json, &err),
            }
        }
        InspectCommand::Read(args) => {
            let (index, config) = (load_index(ctx)?, inspect_config(ctx, Some(&args.thresholds))?);
            let inspector = Inspector::new(&index, &config);
            let log = inspector
                .bundle(&args.job)
                .and_then(|bundle| inspector.read_full(bundle, args.max_lines));
            match log {
                Ok(log) => emit(args.json, &log, render_full),
                Err(err) => report_inspect_error(args.json, &err),
            }
        }
    }
}
