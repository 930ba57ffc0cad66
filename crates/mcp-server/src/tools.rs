//! MCP tools for ciscope
//!
//! Each tool loads the run index of the requested workspace (the saved
//! `_job_index.json`, or a metadata scan when none was saved) and answers
//! with markdown meant to be read by an agent.

use ciscope_capture::{RunIndex, RunInfo};
use ciscope_diff::{smart_diff_sample, SampledDiff};
use ciscope_inspect::render::{
    render_full, render_index, render_operations, render_search, render_size, render_stats,
    render_summary,
};
use ciscope_inspect::{InspectError, Inspector, Operation, SearchOptions};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct CiScopeService {
    config: ServerConfig,
    tool_router: ToolRouter<Self>,
}

impl CiScopeService {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            tool_router: Self::tool_router(),
        }
    }

    fn workspace(&self, requested: Option<&str>) -> PathBuf {
        requested
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.config.workspace.clone())
    }

    fn load_index(&self, requested: Option<&str>) -> Result<RunIndex, CallToolResult> {
        let workspace = self.workspace(requested);
        RunIndex::load_or_build(&workspace, RunInfo::from_env()).map_err(|err| {
            CallToolResult::error(vec![Content::text(format!(
                "Error: failed to load the run index in {}: {err}",
                workspace.display()
            ))])
        })
    }
}

impl Default for CiScopeService {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

#[tool_handler]
impl ServerHandler for CiScopeService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(format!(
                "ciscope gives budget-aware access to the CI logs of one run. Start with \
                 'read_job_index', then 'read_job_summary' and 'check_log_size' for failed jobs; \
                 use 'get_log_stats' and 'search_log' before 'read_full_log'. Large logs are \
                 never returned whole without max_lines.\n\n{}",
                render_operations()
            )),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Tool Input Schemas
// ============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct IndexRequest {
    #[schemars(description = "Workspace holding ci_results/ (defaults to CISCOPE_WORKSPACE)")]
    pub workspace: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct JobRequest {
    #[schemars(description = "Job name as listed by read_job_index")]
    pub job: String,

    #[schemars(description = "Workspace holding ci_results/ (defaults to CISCOPE_WORKSPACE)")]
    pub workspace: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchLogRequest {
    #[schemars(description = "Job name as listed by read_job_index")]
    pub job: String,

    #[schemars(description = "Regular expression (or plain text when literal is true)")]
    pub pattern: String,

    #[schemars(description = "Lines of context before and after each match (default 3)")]
    pub context_lines: Option<usize>,

    #[schemars(description = "Maximum matches to return (default 50)")]
    pub max_matches: Option<usize>,

    #[schemars(description = "Match case exactly (default false)")]
    pub case_sensitive: Option<bool>,

    #[schemars(description = "Treat pattern as plain text (default false)")]
    pub literal: Option<bool>,

    #[schemars(description = "Workspace holding ci_results/ (defaults to CISCOPE_WORKSPACE)")]
    pub workspace: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ReadLogRequest {
    #[schemars(description = "Job name as listed by read_job_index")]
    pub job: String,

    #[schemars(description = "Read at most this many lines from the start (required for large logs)")]
    pub max_lines: Option<usize>,

    #[schemars(description = "Workspace holding ci_results/ (defaults to CISCOPE_WORKSPACE)")]
    pub workspace: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DiffSampleRequest {
    #[schemars(description = "Unified diff text")]
    pub diff: String,

    #[schemars(description = "Commit messages of the change (used for intent keywords)")]
    pub commit_messages: Option<Vec<String>>,
}

/// MCP tool exposing each toolkit operation.
fn mcp_tool_name(operation: Operation) -> &'static str {
    match operation {
        Operation::ReadIndex => "read_job_index",
        Operation::CheckSize => "check_log_size",
        Operation::ReadSummary => "read_job_summary",
        Operation::GetStats => "get_log_stats",
        Operation::Search => "search_log",
        Operation::ReadFull => "read_full_log",
    }
}

fn render_envelope(prefix: &str, err: &InspectError) -> String {
    let envelope = err.to_envelope_with(mcp_tool_name);
    let mut out = format!("{prefix}{}", envelope.message);
    if !envelope.next_actions.is_empty() {
        out.push_str("\n\nNext actions:\n");
        for action in &envelope.next_actions {
            let _ = writeln!(out, "- `{}` {}: {}", action.tool, action.args, action.reason);
        }
    }
    out
}

/// Absent jobs are an expected state, reported as plain text; the size
/// refusal and real failures are tool errors.
fn inspect_failure(err: InspectError) -> CallToolResult {
    match err {
        InspectError::JobNotFound { .. } => {
            CallToolResult::success(vec![Content::text(render_envelope("", &err))])
        }
        other => CallToolResult::error(vec![Content::text(render_envelope("Error: ", &other))]),
    }
}

fn render_sample(sample: &SampledDiff) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "# Diff sample ({:?} tier, {:?})",
        sample.tier, sample.strategy
    );
    let _ = writeln!(
        out,
        "changed lines: {} sampled of {} total across {} file(s)",
        sample.sampled_changed_lines,
        sample.total_changed_lines,
        sample.changed_files.len()
    );
    if !sample.commit_intent_keywords.is_empty() {
        let _ = writeln!(out, "intent keywords: {}", sample.commit_intent_keywords.join(", "));
    }
    if !sample.review_focus_areas.is_empty() {
        let areas: Vec<&str> = sample.review_focus_areas.iter().map(|a| a.as_str()).collect();
        let _ = writeln!(out, "review focus: {}", areas.join(", "));
    }
    if !sample.is_pass_through() {
        let _ = writeln!(out, "selected files: {}", sample.selected_files.join(", "));
    }
    out.push_str("\n```diff\n");
    out.push_str(&sample.sampled_diff_text);
    if !sample.sampled_diff_text.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("```\n");
    out
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl CiScopeService {
    #[tool(description = "List every job of the CI run with conclusion, log size class and whether a summary exists. Cheap; call this first.")]
    pub async fn read_job_index(
        &self,
        Parameters(request): Parameters<IndexRequest>,
    ) -> Result<CallToolResult, McpError> {
        let index = match self.load_index(request.workspace.as_deref()) {
            Ok(index) => index,
            Err(result) => return Ok(result),
        };
        let inspector = Inspector::new(&index, &self.config.inspect);
        Ok(CallToolResult::success(vec![Content::text(render_index(
            &inspector.read_index(),
        ))]))
    }

    #[tool(description = "Size class (small/medium/large) of a job log and how to read it. Cheap; never opens the log.")]
    pub async fn check_log_size(
        &self,
        Parameters(request): Parameters<JobRequest>,
    ) -> Result<CallToolResult, McpError> {
        let index = match self.load_index(request.workspace.as_deref()) {
            Ok(index) => index,
            Err(result) => return Ok(result),
        };
        let inspector = Inspector::new(&index, &self.config.inspect);
        Ok(match inspector.bundle(&request.job) {
            Ok(bundle) => CallToolResult::success(vec![Content::text(render_size(
                &inspector.check_size(bundle),
            ))]),
            Err(err) => inspect_failure(err),
        })
    }

    #[tool(description = "Short summary of a job (test counts, failure headline). Cheap; prefer this over reading logs.")]
    pub async fn read_job_summary(
        &self,
        Parameters(request): Parameters<JobRequest>,
    ) -> Result<CallToolResult, McpError> {
        let index = match self.load_index(request.workspace.as_deref()) {
            Ok(index) => index,
            Err(result) => return Ok(result),
        };
        let inspector = Inspector::new(&index, &self.config.inspect);
        Ok(match inspector.bundle(&request.job) {
            Ok(bundle) => CallToolResult::success(vec![Content::text(render_summary(
                &inspector.read_summary(bundle),
            ))]),
            Err(err) => inspect_failure(err),
        })
    }

    #[tool(description = "Count error, warning, FAILED and exception lines in a job log in one pass, with a recommendation. Medium cost.")]
    pub async fn get_log_stats(
        &self,
        Parameters(request): Parameters<JobRequest>,
    ) -> Result<CallToolResult, McpError> {
        let index = match self.load_index(request.workspace.as_deref()) {
            Ok(index) => index,
            Err(result) => return Ok(result),
        };
        let inspector = Inspector::new(&index, &self.config.inspect);
        let stats = inspector
            .bundle(&request.job)
            .and_then(|bundle| inspector.get_stats(bundle));
        Ok(match stats {
            Ok(stats) => CallToolResult::success(vec![Content::text(render_stats(&stats))]),
            Err(err) => inspect_failure(err),
        })
    }

    #[tool(description = "Search a job log for a pattern and return matching lines with context. Capped by max_matches; safe on large logs. Medium cost.")]
    pub async fn search_log(
        &self,
        Parameters(request): Parameters<SearchLogRequest>,
    ) -> Result<CallToolResult, McpError> {
        let index = match self.load_index(request.workspace.as_deref()) {
            Ok(index) => index,
            Err(result) => return Ok(result),
        };
        let inspector = Inspector::new(&index, &self.config.inspect);
        let options = SearchOptions {
            context_lines: request.context_lines,
            max_matches: request.max_matches,
            case_sensitive: request.case_sensitive.unwrap_or(false),
            literal: request.literal.unwrap_or(false),
        };
        let result = inspector
            .bundle(&request.job)
            .and_then(|bundle| inspector.search(bundle, &request.pattern, &options));
        Ok(match result {
            Ok(result) => CallToolResult::success(vec![Content::text(render_search(&result))]),
            Err(err) => inspect_failure(err),
        })
    }

    #[tool(description = "Read a job log. Refused for large logs unless max_lines is given; use get_log_stats or search_log instead. Expensive.")]
    pub async fn read_full_log(
        &self,
        Parameters(request): Parameters<ReadLogRequest>,
    ) -> Result<CallToolResult, McpError> {
        let index = match self.load_index(request.workspace.as_deref()) {
            Ok(index) => index,
            Err(result) => return Ok(result),
        };
        let inspector = Inspector::new(&index, &self.config.inspect);
        let log = inspector
            .bundle(&request.job)
            .and_then(|bundle| inspector.read_full(bundle, request.max_lines));
        Ok(match log {
            Ok(log) => CallToolResult::success(vec![Content::text(render_full(&log))]),
            Err(err) => inspect_failure(err),
        })
    }

    #[tool(description = "Reduce a unified diff to a bounded review sample: small diffs unchanged, medium diffs filtered by commit intent, large diffs cut to the riskiest files.")]
    pub async fn smart_diff_sample(
        &self,
        Parameters(request): Parameters<DiffSampleRequest>,
    ) -> Result<CallToolResult, McpError> {
        let messages = request.commit_messages.unwrap_or_default();
        let sample = smart_diff_sample(&request.diff, &messages, &self.config.sampling);
        Ok(CallToolResult::success(vec![Content::text(render_sample(
            &sample,
        ))]))
    }
}
