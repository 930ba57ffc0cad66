//! # ciscope inspect
//!
//! Bounded access to captured CI logs. Operations are graded by cost so a
//! caller with a fixed context budget can escalate one step at a time:
//!
//! | operation      | cost      | touches the log? |
//! |----------------|-----------|------------------|
//! | `read_index`   | cheap     | no               |
//! | `check_size`   | cheap     | no               |
//! | `read_summary` | cheap     | summary only     |
//! | `get_stats`    | medium    | one streaming pass |
//! | `search`       | medium    | one streaming pass, capped |
//! | `read_full`    | expensive | yes; refused for large logs without `max_lines` |
//!
//! ```no_run
//! use ciscope_capture::{RunIndex, RunInfo};
//! use ciscope_inspect::{InspectConfig, Inspector, SearchOptions};
//!
//! fn main() -> ciscope_inspect::Result<()> {
//!     let index = RunIndex::load_or_build("workspace".as_ref(), RunInfo::from_env())?;
//!     let config = InspectConfig::default();
//!     let inspector = Inspector::new(&index, &config);
//!
//!     for job in inspector.read_index().failed_jobs() {
//!         let bundle = inspector.bundle(&job.job_name)?;
//!         let hits = inspector.search(bundle, "error", &SearchOptions::default())?;
//!         println!("{}: {} matches", job.job_name, hits.matches.len());
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod lines;
mod patterns;
pub mod render;
mod search;
mod size;
mod stats;
mod toolkit;

pub use config::InspectConfig;
pub use error::{InspectError, Result};
pub use patterns::{build_regex, CompiledPattern, Severity, StatPattern};
pub use search::{SearchMatch, SearchOptions, SearchResult};
pub use size::{format_kb, SizeClass, SizeThresholds};
pub use stats::{LogStats, PatternCount, StatsRecommendation};
pub use toolkit::{
    FullLog, IndexOverview, IndexOverviewEntry, Inspector, JobSummary, Operation, SizeReport,
    NO_SUMMARY,
};
