use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::Result;

const SAMPLE_MESSAGES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommitAuthor {
    Name(String),
    Detailed { name: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitInfo {
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<CommitAuthor>,
    #[serde(default)]
    pub date: Option<String>,
}

impl CommitInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            sha: None,
            message: message.into(),
            author: None,
            date: None,
        }
    }

    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }

    pub fn author_name(&self) -> &str {
        match &self.author {
            Some(CommitAuthor::Name(name)) => name,
            Some(CommitAuthor::Detailed { name: Some(name) }) => name,
            _ => "Unknown",
        }
    }
}

/// Parse a JSON array of commit objects (`sha`, `message`, `author`, `date`).
pub fn parse_commits_json(raw: &str) -> Result<Vec<CommitInfo>> {
    Ok(serde_json::from_str(raw)?)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub total: usize,
    pub commit_types: BTreeMap<String, usize>,
    pub author_count: usize,
    pub authors: Vec<String>,
    pub first_commit: Option<String>,
    pub last_commit: Option<String>,
    pub sample_messages: Vec<String>,
    pub summary: String,
}

/// `feat(api)!: x` -> `feat`. Subjects without a lowercase type prefix have none.
fn conventional_type(subject: &str) -> Option<String> {
    let (head, _) = subject.split_once(':')?;
    let head = head.trim().trim_end_matches('!');
    let kind = head.split('(').next().unwrap_or(head).trim();
    (!kind.is_empty() && kind.chars().all(|c| c.is_ascii_lowercase()))
        .then(|| kind.to_string())
}

/// Condense a long commit history into counts and a few sample subjects.
pub fn summarize_commits(commits: &[CommitInfo]) -> CommitSummary {
    if commits.is_empty() {
        return CommitSummary {
            summary: "No commits to summarize".to_string(),
            ..Default::default()
        };
    }

    let mut commit_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut authors: BTreeSet<String> = BTreeSet::new();
    for commit in commits {
        if let Some(kind) = conventional_type(commit.subject()) {
            *commit_types.entry(kind).or_default() += 1;
        }
        authors.insert(commit.author_name().to_string());
    }

    let type_summary = commit_types
        .iter()
        .map(|(kind, count)| format!("{count} {kind}"))
        .collect::<Vec<_>>()
        .join(", ");
    let summary = format!(
        "{} commits by {} author(s): {}",
        commits.len(),
        authors.len(),
        if type_summary.is_empty() {
            "mixed types"
        } else {
            &type_summary
        }
    );
    log::debug!("Commit summary: {summary}");

    CommitSummary {
        total: commits.len(),
        commit_types,
        author_count: authors.len(),
        authors: authors.into_iter().collect(),
        first_commit: commits.first().map(|c| c.subject().to_string()),
        last_commit: commits.last().map(|c| c.subject().to_string()),
        sample_messages: commits
            .iter()
            .take(SAMPLE_MESSAGES)
            .map(|c| c.subject().to_string())
            .collect(),
        summary,
    }
}
