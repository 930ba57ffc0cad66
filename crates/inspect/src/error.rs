use ciscope_protocol::{ErrorEnvelope, ToolNextAction};
use serde_json::json;
use thiserror::Error;

use crate::size::format_kb;
use crate::toolkit::Operation;

pub type Result<T> = std::result::Result<T, InspectError>;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Capture error: {0}")]
    CaptureError(#[from] ciscope_capture::CaptureError),

    #[error("Job '{job_name}' is absent from the run index (available: {})", format_available(.available))]
    JobNotFound {
        job_name: String,
        available: Vec<String>,
    },

    #[error("Invalid search pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error(
        "Log for job '{job_name}' is {size_bytes} bytes ({kb} KB), above the {threshold_bytes}-byte \
         limit for unbounded reads. Use `get_stats` to gauge it, `search` to find specific lines, \
         or pass `max_lines` to read a bounded prefix.",
        kb = kb_of(.size_bytes)
    )]
    SizeLimitExceeded {
        job_name: String,
        size_bytes: u64,
        threshold_bytes: u64,
    },

    #[error("Invalid inspect config: {0}")]
    InvalidConfig(String),
}

fn kb_of(bytes: &u64) -> String {
    format_kb(*bytes)
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    }
}

impl InspectError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::IoError(_) | Self::CaptureError(_) => "io_error",
            Self::JobNotFound { .. } => "job_not_found",
            Self::InvalidPattern { .. } => "invalid_pattern",
            Self::SizeLimitExceeded { .. } => "size_limit_exceeded",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }

    /// Agent-facing form of the error, with the compliant follow-up calls
    /// named after the toolkit operations.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        self.to_envelope_with(Operation::name)
    }

    /// Same as [`Self::to_envelope`], with follow-up calls named by
    /// `tool_name` for surfaces that expose operations under other names.
    pub fn to_envelope_with(&self, tool_name: impl Fn(Operation) -> &'static str) -> ErrorEnvelope {
        let mut envelope = ErrorEnvelope::new(self.code(), self.to_string());
        match self {
            Self::SizeLimitExceeded {
                job_name,
                size_bytes,
                threshold_bytes,
            } => {
                envelope.details = Some(json!({
                    "job_name": job_name,
                    "size_bytes": size_bytes,
                    "threshold_bytes": threshold_bytes,
                }));
                envelope.hint = Some("Large logs must be searched, not read whole.".to_string());
                envelope.next_actions = vec![
                    ToolNextAction {
                        tool: tool_name(Operation::GetStats).to_string(),
                        args: json!({ "job": job_name }),
                        reason: "Count errors and warnings without reading the log.".to_string(),
                    },
                    ToolNextAction {
                        tool: tool_name(Operation::Search).to_string(),
                        args: json!({ "job": job_name, "pattern": "error" }),
                        reason: "Pull only the matching lines with context.".to_string(),
                    },
                ];
            }
            Self::JobNotFound { available, .. } => {
                envelope.details = Some(json!({ "available": available }));
                envelope.next_actions = vec![ToolNextAction {
                    tool: tool_name(Operation::ReadIndex).to_string(),
                    args: json!({}),
                    reason: "List the jobs that produced a bundle.".to_string(),
                }];
            }
            _ => {}
        }
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limit_message_is_actionable() {
        let err = InspectError::SizeLimitExceeded {
            job_name: "core-ci".to_string(),
            size_bytes: 250_000,
            threshold_bytes: 200_000,
        };
        let message = err.to_string();
        assert!(message.contains("250000 bytes"));
        assert!(message.contains("250.0 KB"));
        assert!(message.contains("200000"));
        assert!(message.contains("`get_stats`"));
        assert!(message.contains("`search`"));

        let envelope = err.to_envelope();
        assert_eq!(envelope.code, "size_limit_exceeded");
        let tools: Vec<&str> = envelope.next_actions.iter().map(|a| a.tool.as_str()).collect();
        assert_eq!(tools, vec!["get_stats", "search"]);
    }

    #[test]
    fn envelope_tool_names_follow_the_surface() {
        let err = InspectError::SizeLimitExceeded {
            job_name: "core-ci".to_string(),
            size_bytes: 250_000,
            threshold_bytes: 200_000,
        };
        let envelope = err.to_envelope_with(|op| match op {
            Operation::GetStats => "get_log_stats",
            Operation::Search => "search_log",
            other => other.name(),
        });
        let tools: Vec<&str> = envelope.next_actions.iter().map(|a| a.tool.as_str()).collect();
        assert_eq!(tools, vec!["get_log_stats", "search_log"]);
        assert!(envelope.message.contains("`get_stats`"));
    }

    #[test]
    fn job_not_found_lists_available_jobs() {
        let err = InspectError::JobNotFound {
            job_name: "core-ci".to_string(),
            available: vec!["lint".to_string(), "tests".to_string()],
        };
        assert!(err.to_string().contains("absent from the run index"));
        assert!(err.to_string().contains("lint, tests"));
    }
}
