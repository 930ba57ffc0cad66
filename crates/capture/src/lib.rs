//! # ciscope capture
//!
//! Turns the console output of one CI job into a self-describing bundle, and
//! assembles the bundles of a whole run into a read-only index.
//!
//! ## Lifecycle
//!
//! ```text
//! job starts (after checkout)
//!     │
//!     ├──> initialize_capture   empty log.txt + start marker + placeholder metadata.json
//!     │
//!     ├──> append / tee          every step writes into the same append-only log
//!     │
//!     └──> finalize (always)     size_bytes + line_count measured once,
//!                                summary.md copied, metadata.json written last
//!
//! consumer job (after all producers)
//!     │
//!     └──> build_run_index       reads metadata.json of every bundle folder,
//!                                never the logs; writes _job_index.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use ciscope_capture::{build_run_index, initialize_capture, Conclusion, RunInfo};
//!
//! fn main() -> ciscope_capture::Result<()> {
//!     let staging = std::path::Path::new("workspace/ci_results");
//!     let mut handle = initialize_capture(staging, "core-ci")?;
//!     handle.append(b"cargo test\n")?;
//!     let bundle = handle.finalize(Conclusion::Success, None)?;
//!     println!("{} bytes captured", bundle.size_bytes);
//!
//!     let index = build_run_index("workspace".as_ref(), RunInfo::from_env())?;
//!     println!("{} bundles", index.len());
//!     Ok(())
//! }
//! ```

mod bundle;
mod capture;
mod error;
mod index;
pub mod layout;
mod sink;
mod tee;

pub use bundle::{BundleMetadata, Conclusion, JobBundle};
pub use capture::{count_lines, initialize_capture, CaptureHandle};
pub use error::{CaptureError, Result};
pub use index::{build_run_index, IndexEntry, RunIndex, RunInfo, SkippedBundle};
pub use sink::{FileLogSink, LogSink, TeeSink, WriteSink};
pub use tee::run_teed;
