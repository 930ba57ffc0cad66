//! Additive risk scoring as an ordered list of independent weighted rules.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::parse::FileDiff;

/// Path fragments that mark a file as security, money or data sensitive.
pub const RISKY_PATH_KEYWORDS: &[&str] = &[
    "auth", "login", "signup", "user", "payment", "billing", "checkout", "transaction", "order",
    "invoice", "config", "settings", "env", "secret", "credential", "token", "key", "crypto",
    "hash", "password", "database", "db", "schema", "migration",
];

const CONFIG_EXTENSIONS: &[&str] = &[
    "yml", "yaml", "json", "toml", "ini", "env", "cfg", "conf", "properties",
];

const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "ts", "tsx", "go", "java", "kt", "rb", "php", "c", "h", "cc", "cpp",
    "hpp", "cs", "swift", "scala", "sh", "bash", "sql", "vue", "svelte",
];

const DOC_EXTENSIONS: &[&str] = &["md", "markdown", "rst", "txt", "adoc"];

static SENSITIVE_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(password|passwd|secret|api[_-]?key|private[_-]?key|credential|access[_-]?token|auth[a-z]*|payment|billing|crypto[a-z]*)\b",
    )
    .expect("SENSITIVE_CONTENT regex should compile")
});

/// `test`/`spec` starting a path token (`tests/`, `parser_tests.rs`,
/// `testutils`) or a camel-case word (`FooTest`, `BarSpec`). Words that merely
/// contain the letters, like `latest` or `inspect`, do not count.
static TEST_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z])(?i:test|spec)|[a-z0-9](?:Test|Spec|TEST|SPEC)|(?:^|/)fixtures/")
        .expect("TEST_PATH regex should compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Source,
    Test,
    Config,
    Docs,
    Ci,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusArea {
    Security,
    Payment,
    Database,
    Config,
    Ci,
    Tests,
    Docs,
}

impl FocusArea {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Payment => "payment",
            Self::Database => "database",
            Self::Config => "config",
            Self::Ci => "ci",
            Self::Tests => "tests",
            Self::Docs => "docs",
        }
    }
}

fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    // `.env` yields `env`
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

pub fn is_test_path(path: &str) -> bool {
    TEST_PATH.is_match(path)
}

pub fn is_config_path(path: &str) -> bool {
    let lowered = path.to_ascii_lowercase();
    let name = lowered.rsplit('/').next().unwrap_or(&lowered);
    if name == ".env" || name.starts_with(".env.") {
        return true;
    }
    if extension(&lowered).is_some_and(|ext| CONFIG_EXTENSIONS.contains(&ext.as_str())) {
        return true;
    }
    lowered
        .split('/')
        .rev()
        .skip(1)
        .any(|dir| dir == "config" || dir == "settings")
}

fn is_ci_path(path: &str) -> bool {
    let lowered = path.to_ascii_lowercase();
    lowered.starts_with(".github/workflows/")
        || lowered.starts_with(".github/actions/")
        || lowered.starts_with(".circleci/")
        || lowered == ".gitlab-ci.yml"
        || lowered == "jenkinsfile"
        || lowered.ends_with("/jenkinsfile")
}

pub fn classify_file_type(path: &str) -> FileType {
    if is_ci_path(path) {
        return FileType::Ci;
    }
    if is_test_path(path) {
        return FileType::Test;
    }
    if is_config_path(path) {
        return FileType::Config;
    }
    let lowered = path.to_ascii_lowercase();
    let ext = extension(&lowered);
    if lowered.starts_with("docs/")
        || ext
            .as_deref()
            .is_some_and(|ext| DOC_EXTENSIONS.contains(&ext))
    {
        return FileType::Docs;
    }
    if ext
        .as_deref()
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
    {
        return FileType::Source;
    }
    FileType::Other
}

/// Facts about one changed file that the rules look at.
#[derive(Debug, Clone, Copy)]
pub struct RiskInput<'a> {
    pub file: &'a FileDiff,
}

impl RiskInput<'_> {
    fn path_lower(&self) -> String {
        self.file.path.to_ascii_lowercase()
    }
}

/// `(name, weight, predicate)`; the score is the sum of the weights whose
/// predicate holds.
#[derive(Clone, Copy)]
pub struct RiskRule {
    pub name: &'static str,
    pub weight: i32,
    predicate: fn(&RiskInput<'_>) -> bool,
}

impl std::fmt::Debug for RiskRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskRule")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish()
    }
}

impl RiskRule {
    pub const fn new(name: &'static str, weight: i32, predicate: fn(&RiskInput<'_>) -> bool) -> Self {
        Self {
            name,
            weight,
            predicate,
        }
    }

    pub fn applies(&self, input: &RiskInput<'_>) -> bool {
        (self.predicate)(input)
    }
}

fn sensitive_keyword(input: &RiskInput<'_>) -> bool {
    let path = input.path_lower();
    RISKY_PATH_KEYWORDS.iter().any(|kw| path.contains(kw))
        || input.file.changed_text().any(|line| SENSITIVE_CONTENT.is_match(line))
}

fn config_file(input: &RiskInput<'_>) -> bool {
    is_config_path(&input.file.path)
}

fn large_change(input: &RiskInput<'_>) -> bool {
    input.file.changed_lines() > 200
}

fn medium_change(input: &RiskInput<'_>) -> bool {
    (50..=200).contains(&input.file.changed_lines())
}

fn test_file(input: &RiskInput<'_>) -> bool {
    is_test_path(&input.file.path)
}

pub const DEFAULT_RULES: [RiskRule; 5] = [
    RiskRule::new("sensitive_keyword", 3, sensitive_keyword),
    RiskRule::new("config_file", 2, config_file),
    RiskRule::new("large_change", 3, large_change),
    RiskRule::new("medium_change", 1, medium_change),
    RiskRule::new("test_file", -2, test_file),
];

pub fn score_with(rules: &[RiskRule], file: &FileDiff) -> i32 {
    let input = RiskInput { file };
    rules
        .iter()
        .filter(|rule| rule.applies(&input))
        .map(|rule| rule.weight)
        .sum()
}

pub fn risk_score(file: &FileDiff) -> i32 {
    score_with(&DEFAULT_RULES, file)
}

/// Names and weights of the default rules that fired for `file`.
pub fn explain_score(file: &FileDiff) -> Vec<(&'static str, i32)> {
    let input = RiskInput { file };
    DEFAULT_RULES
        .iter()
        .filter(|rule| rule.applies(&input))
        .map(|rule| (rule.name, rule.weight))
        .collect()
}

/// Paths with a positive score, highest first (ties keep diff order).
pub fn identify_critical_paths(files: &[FileDiff], max_files: usize) -> Vec<String> {
    let mut scored: Vec<(i32, &FileDiff)> = files
        .iter()
        .map(|f| (risk_score(f), f))
        .filter(|(score, _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored
        .into_iter()
        .take(max_files)
        .map(|(_, f)| f.path.clone())
        .collect()
}

fn path_focus(path: &str) -> impl Iterator<Item = FocusArea> + '_ {
    const GROUPS: &[(FocusArea, &[&str])] = &[
        (
            FocusArea::Security,
            &["auth", "login", "signup", "secret", "credential", "token", "crypto", "password", "key"],
        ),
        (
            FocusArea::Payment,
            &["payment", "billing", "checkout", "transaction", "invoice", "order"],
        ),
        (FocusArea::Database, &["database", "db", "schema", "migration", "sql"]),
    ];
    GROUPS
        .iter()
        .filter(move |(_, words)| words.iter().any(|w| path.contains(w)))
        .map(|(area, _)| *area)
}

/// Review categories touched by the diff.
pub fn review_focus_areas(files: &[FileDiff]) -> BTreeSet<FocusArea> {
    let mut areas = BTreeSet::new();
    for file in files {
        let path = file.path.to_ascii_lowercase();
        areas.extend(path_focus(&path));
        match classify_file_type(&file.path) {
            FileType::Config => {
                areas.insert(FocusArea::Config);
            }
            FileType::Ci => {
                areas.insert(FocusArea::Ci);
            }
            FileType::Test => {
                areas.insert(FocusArea::Tests);
            }
            FileType::Docs => {
                areas.insert(FocusArea::Docs);
            }
            FileType::Source | FileType::Other => {}
        }
    }
    areas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::DiffHunk;

    fn file(path: &str, changed: usize, body: &str) -> FileDiff {
        FileDiff {
            path: path.to_string(),
            header: vec![format!("+++ b/{path}")],
            hunks: vec![DiffHunk {
                old_start: 1,
                old_count: 0,
                new_start: 1,
                new_count: changed as u32,
                header: format!("@@ -1,0 +1,{changed} @@"),
                lines: (0..changed).map(|_| format!("+{body}")).collect(),
            }],
        }
    }

    #[test]
    fn rules_score_independently() {
        assert_eq!(risk_score(&file("src/lib.rs", 3, "let x = 1;")), 0);
        assert_eq!(risk_score(&file("src/auth/session.rs", 3, "let x = 1;")), 3);
        assert_eq!(risk_score(&file("deploy/app.yaml", 3, "replicas: 2")), 2);
        assert_eq!(risk_score(&file("src/lib.rs", 201, "let x = 1;")), 3);
        assert_eq!(risk_score(&file("src/lib.rs", 50, "let x = 1;")), 1);
        assert_eq!(risk_score(&file("src/lib.rs", 200, "let x = 1;")), 1);
        assert_eq!(risk_score(&file("tests/parser.rs", 3, "let x = 1;")), -2);
    }

    #[test]
    fn content_can_carry_sensitivity() {
        assert_eq!(risk_score(&file("src/lib.rs", 2, "let password = read();")), 3);
        assert_eq!(
            explain_score(&file("src/lib.rs", 2, "let api_key = env();")),
            vec![("sensitive_keyword", 3)]
        );
    }

    #[test]
    fn scores_combine_and_may_go_negative() {
        // keyword + config + large
        assert_eq!(risk_score(&file("config/secrets.yml", 250, "a: b")), 8);
        // large test file: +3 - 2
        assert_eq!(risk_score(&file("src/parser_test.rs", 250, "x")), 1);
    }

    #[test]
    fn extensionless_files_are_neutral() {
        assert_eq!(risk_score(&file("scripts/run", 3, "echo hi")), 0);
        assert_eq!(classify_file_type("scripts/run"), FileType::Other);
    }

    #[test]
    fn file_types() {
        assert_eq!(classify_file_type(".github/workflows/ci.yml"), FileType::Ci);
        assert_eq!(classify_file_type("src/foo.test.ts"), FileType::Test);
        assert_eq!(classify_file_type("tests/it.rs"), FileType::Test);
        assert_eq!(classify_file_type(".env.local"), FileType::Config);
        assert_eq!(classify_file_type("Cargo.toml"), FileType::Config);
        assert_eq!(classify_file_type("README.md"), FileType::Docs);
        assert_eq!(classify_file_type("src/main.rs"), FileType::Source);
        assert_eq!(classify_file_type("src/inspect.rs"), FileType::Source);
    }

    #[test]
    fn test_paths_follow_common_conventions() {
        for path in [
            "app/FooTest.java",
            "src/test.rs",
            "pkg/parser_tests.rs",
            "src/testutils.rs",
            "lib/FooSpec.scala",
            "web/__tests__/app.js",
            "spec/models/user_spec.rb",
            "tests/fixtures/input.json",
            "TEST_PLAN.md",
        ] {
            assert!(is_test_path(path), "{path} should be a test path");
        }
        for path in [
            "src/latest.rs",
            "crates/inspect/src/lib.rs",
            "src/respect.rs",
            "src/contest/mod.rs",
        ] {
            assert!(!is_test_path(path), "{path} should not be a test path");
        }
        assert_eq!(risk_score(&file("app/FooTest.java", 3, "x")), -2);
    }

    #[test]
    fn critical_paths_are_ranked_and_positive() {
        let files = vec![
            file("src/lib.rs", 3, "x"),
            file("src/auth.rs", 3, "x"),
            file("config/app.yaml", 3, "x"),
            file("src/payment.rs", 250, "x"),
        ];
        assert_eq!(
            identify_critical_paths(&files, 12),
            vec!["src/payment.rs", "config/app.yaml", "src/auth.rs"]
        );
        assert_eq!(identify_critical_paths(&files, 1), vec!["src/payment.rs"]);
    }

    #[test]
    fn focus_areas_follow_paths_and_types() {
        let files = vec![
            file("src/billing/invoice.rs", 1, "x"),
            file("migrations/001_schema.sql", 1, "x"),
            file(".github/workflows/ci.yml", 1, "x"),
            file("docs/guide.md", 1, "x"),
        ];
        let areas: Vec<&str> = review_focus_areas(&files).into_iter().map(FocusArea::as_str).collect();
        assert_eq!(areas, vec!["payment", "database", "ci", "docs"]);
    }
}
