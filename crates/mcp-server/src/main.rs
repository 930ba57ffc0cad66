//! ciscope MCP Server
//!
//! Gives an AI agent budget-aware access to the CI logs of one run and a
//! bounded view of large diffs.
//!
//! ## Tools
//!
//! - `read_job_index` - every job with conclusion, size class and summary flag (cheap)
//! - `check_log_size` - size class and reading recommendation (cheap)
//! - `read_job_summary` - the job's short summary (cheap)
//! - `get_log_stats` - error/warning/failure/exception counts (medium)
//! - `search_log` - matching lines with context, capped (medium)
//! - `read_full_log` - whole log; refused for large logs without `max_lines` (expensive)
//! - `smart_diff_sample` - adaptive, risk-aware diff sample
//!
//! ## Usage
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "ciscope": {
//!       "command": "ciscope-mcp",
//!       "env": { "CISCOPE_WORKSPACE": "/path/to/downloaded/artifacts" }
//!     }
//!   }
//! }
//! ```

use anyhow::Result;
use rmcp::transport::stdio;
use rmcp::ServiceExt;

mod config;
mod tools;

use tools::CiScopeService;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP protocol
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = config::ServerConfig::load()?;
    log::info!(
        "Starting ciscope MCP server (workspace {})",
        config.workspace.display()
    );

    let server = CiScopeService::new(config).serve(stdio()).await?;
    server.waiting().await?;

    log::info!("ciscope MCP server stopped");
    Ok(())
}
