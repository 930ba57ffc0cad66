use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::{InspectError, Result};

/// How much a hit on a stat pattern should worry the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One `{label, pattern}` pair counted by `get_stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatPattern {
    pub label: String,
    pub pattern: String,
    /// Treat `pattern` as a regular expression instead of a plain substring.
    #[serde(default)]
    pub regex: bool,
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
    #[serde(default = "default_severity")]
    pub severity: Severity,
}

fn default_case_sensitive() -> bool {
    true
}

fn default_severity() -> Severity {
    Severity::Error
}

impl StatPattern {
    pub fn substring(label: &str, pattern: &str, severity: Severity) -> Self {
        Self {
            label: label.to_string(),
            pattern: pattern.to_string(),
            regex: false,
            case_sensitive: true,
            severity,
        }
    }

    /// The stock set: case-sensitive `error`, `warning`, `FAILED`, `exception`.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::substring("error", "error", Severity::Error),
            Self::substring("warning", "warning", Severity::Warning),
            Self::substring("failed", "FAILED", Severity::Error),
            Self::substring("exception", "exception", Severity::Error),
        ]
    }

    pub fn compile(&self) -> Result<CompiledPattern> {
        if self.pattern.is_empty() {
            return Err(InspectError::InvalidPattern {
                pattern: self.pattern.clone(),
                reason: format!("stat pattern '{}' is empty", self.label),
            });
        }
        let matcher = if self.regex {
            Matcher::Regex(build_regex(&self.pattern, self.case_sensitive, false)?)
        } else if self.case_sensitive {
            Matcher::Substring(self.pattern.clone())
        } else {
            Matcher::SubstringIgnoreCase(self.pattern.to_lowercase())
        };
        Ok(CompiledPattern {
            label: self.label.clone(),
            severity: self.severity,
            matcher,
        })
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Substring(String),
    SubstringIgnoreCase(String),
    Regex(Regex),
}

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub label: String,
    pub severity: Severity,
    matcher: Matcher,
}

impl CompiledPattern {
    pub fn is_match(&self, line: &str) -> bool {
        match &self.matcher {
            Matcher::Substring(needle) => line.contains(needle.as_str()),
            Matcher::SubstringIgnoreCase(needle) => line.to_lowercase().contains(needle.as_str()),
            Matcher::Regex(re) => re.is_match(line),
        }
    }
}

/// Compile a user-supplied search pattern. `literal` escapes regex syntax.
pub fn build_regex(pattern: &str, case_sensitive: bool, literal: bool) -> Result<Regex> {
    if pattern.is_empty() {
        return Err(InspectError::InvalidPattern {
            pattern: String::new(),
            reason: "pattern is empty".to_string(),
        });
    }
    let source = if literal {
        regex::escape(pattern)
    } else {
        pattern.to_string()
    };
    RegexBuilder::new(&source)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|err| InspectError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })
}
