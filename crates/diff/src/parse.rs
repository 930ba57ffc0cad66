//! Tolerant unified-diff parser. Hunks whose header cannot be parsed are
//! skipped with a log line; nothing here returns an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@")
        .expect("HUNK_HEADER regex should compile")
});

/// One `@@ ... @@` block, with its raw lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    pub header: String,
    pub lines: Vec<String>,
}

impl DiffHunk {
    pub fn additions(&self) -> usize {
        self.lines.iter().filter(|l| l.starts_with('+')).count()
    }

    pub fn deletions(&self) -> usize {
        self.lines.iter().filter(|l| l.starts_with('-')).count()
    }

    pub fn changed_lines(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| l.starts_with('+') || l.starts_with('-'))
            .count()
    }
}

/// Every hunk touching one path, plus the header lines that introduce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    /// `diff --git`, `index`, `---`, `+++` and similar lines, verbatim.
    pub header: Vec<String>,
    pub hunks: Vec<DiffHunk>,
}

impl FileDiff {
    fn new(path: String) -> Self {
        Self {
            path,
            header: Vec::new(),
            hunks: Vec::new(),
        }
    }

    pub fn additions(&self) -> usize {
        self.hunks.iter().map(DiffHunk::additions).sum()
    }

    pub fn deletions(&self) -> usize {
        self.hunks.iter().map(DiffHunk::deletions).sum()
    }

    pub fn changed_lines(&self) -> usize {
        self.additions() + self.deletions()
    }

    /// Added and removed line bodies, without the `+`/`-` marker.
    pub fn changed_text(&self) -> impl Iterator<Item = &str> {
        self.hunks.iter().flat_map(|h| {
            h.lines
                .iter()
                .filter(|l| l.starts_with('+') || l.starts_with('-'))
                .map(|l| &l[1..])
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDiff {
    /// Lines before the first file (mail headers, commit text).
    pub preamble: Vec<String>,
    pub files: Vec<FileDiff>,
    pub skipped_hunks: usize,
}

impl ParsedDiff {
    pub fn total_changed_lines(&self) -> usize {
        self.files.iter().map(FileDiff::changed_lines).sum()
    }
}

/// Per-file change counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub path: String,
    pub additions: usize,
    pub deletions: usize,
}

impl FileSummary {
    pub fn total_changes(&self) -> usize {
        self.additions + self.deletions
    }
}

enum State {
    Header,
    InHunk { old_left: u32, new_left: u32 },
    SkippingHunk,
}

fn strip_prefix_path(raw: &str) -> Option<String> {
    let raw = raw.split('\t').next().unwrap_or(raw).trim();
    if raw == "/dev/null" || raw.is_empty() {
        return None;
    }
    let path = raw
        .strip_prefix("a/")
        .or_else(|| raw.strip_prefix("b/"))
        .unwrap_or(raw);
    Some(path.to_string())
}

fn git_header_path(line: &str) -> String {
    // diff --git a/<old> b/<new>
    let rest = line.trim_start_matches("diff --git ").trim();
    match rest.rfind(" b/") {
        Some(idx) => rest[idx + 3..].to_string(),
        None => rest.to_string(),
    }
}

fn parse_hunk_header(line: &str) -> Option<DiffHunk> {
    let caps = HUNK_HEADER.captures(line)?;
    let num = |i: usize, default: u32| -> Option<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };
    Some(DiffHunk {
        old_start: num(1, 0)?,
        old_count: num(2, 1)?,
        new_start: num(3, 0)?,
        new_count: num(4, 1)?,
        header: line.to_string(),
        lines: Vec::new(),
    })
}

/// Parse `diff_text` into files and hunks.
pub fn parse_diff(diff_text: &str) -> ParsedDiff {
    let mut parsed = ParsedDiff::default();
    let mut current: Option<FileDiff> = None;
    let mut state = State::Header;

    for line in diff_text.lines() {
        if let State::InHunk { old_left, new_left } = &mut state {
            let consumed = match line.as_bytes().first() {
                Some(b'+') => {
                    *new_left = new_left.saturating_sub(1);
                    true
                }
                Some(b'-') => {
                    *old_left = old_left.saturating_sub(1);
                    true
                }
                Some(b' ') | None => {
                    *old_left = old_left.saturating_sub(1);
                    *new_left = new_left.saturating_sub(1);
                    true
                }
                Some(b'\\') => true,
                _ => false,
            };
            if consumed {
                if let Some(hunk) = current.as_mut().and_then(|f| f.hunks.last_mut()) {
                    hunk.lines.push(line.to_string());
                }
                if *old_left == 0 && *new_left == 0 {
                    state = State::Header;
                }
                continue;
            }
            log::debug!("Hunk ended early at line {line:?}");
            state = State::Header;
        }

        if line.starts_with("diff --git ") {
            parsed.files.extend(current.take());
            let mut file = FileDiff::new(git_header_path(line));
            file.header.push(line.to_string());
            current = Some(file);
            state = State::Header;
            continue;
        }

        if line.starts_with("@@") {
            match parse_hunk_header(line) {
                Some(hunk) => {
                    let file = current.get_or_insert_with(|| FileDiff::new(String::new()));
                    state = State::InHunk {
                        old_left: hunk.old_count,
                        new_left: hunk.new_count,
                    };
                    if hunk.old_count == 0 && hunk.new_count == 0 {
                        state = State::Header;
                    }
                    file.hunks.push(hunk);
                }
                None => {
                    log::warn!("Skipping unparseable hunk header {line:?}");
                    parsed.skipped_hunks += 1;
                    state = State::SkippingHunk;
                }
            }
            continue;
        }

        if matches!(state, State::SkippingHunk)
            && (line.starts_with('+') || line.starts_with('-') || line.starts_with(' '))
            && !line.starts_with("--- ")
        {
            continue;
        }
        state = State::Header;

        if let Some(rest) = line.strip_prefix("--- ") {
            // A plain unified diff (no `diff --git`) starts a new file here.
            let starts_new_file = match &current {
                None => true,
                Some(file) => !file.hunks.is_empty(),
            };
            if starts_new_file {
                parsed.files.extend(current.take());
                current = Some(FileDiff::new(strip_prefix_path(rest).unwrap_or_default()));
            }
            if let Some(file) = current.as_mut() {
                file.header.push(line.to_string());
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("+++ ") {
            if let Some(file) = current.as_mut() {
                if let Some(path) = strip_prefix_path(rest) {
                    file.path = path;
                }
                file.header.push(line.to_string());
            }
            continue;
        }

        match current.as_mut() {
            Some(file) if file.hunks.is_empty() => file.header.push(line.to_string()),
            Some(file) => {
                log::debug!("Ignoring stray line in {}: {line:?}", file.path);
            }
            None => parsed.preamble.push(line.to_string()),
        }
    }

    parsed.files.extend(current);
    for file in &mut parsed.files {
        if file.path.is_empty() {
            file.path = "(unknown)".to_string();
        }
    }
    parsed
}

/// Count of `+`/`-` lines inside parsed hunks.
pub fn total_changed_lines(diff_text: &str) -> usize {
    parse_diff(diff_text).total_changed_lines()
}

/// Per-file additions and deletions, in diff order.
pub fn summarize_diff(diff_text: &str) -> Vec<FileSummary> {
    parse_diff(diff_text)
        .files
        .iter()
        .map(|f| FileSummary {
            path: f.path.clone(),
            additions: f.additions(),
            deletions: f.deletions(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TWO_FILES: &str = "\
diff --git a/src/auth.rs b/src/auth.rs
index 1111111..2222222 100644
--- a/src/auth.rs
+++ b/src/auth.rs
@@ -1,3 +1,4 @@
 fn login() {
-    check();
+    check_password();
+    audit();
 }
diff --git a/README.md b/README.md
--- a/README.md
+++ b/README.md
@@ -10,2 +10,2 @@ intro
-old words
+new words
 same
";

    #[test]
    fn parses_git_diff_into_files_and_hunks() {
        let parsed = parse_diff(TWO_FILES);
        assert_eq!(parsed.files.len(), 2);
        let auth = &parsed.files[0];
        assert_eq!(auth.path, "src/auth.rs");
        assert_eq!(auth.header.len(), 4);
        assert_eq!(auth.hunks.len(), 1);
        assert_eq!(auth.additions(), 2);
        assert_eq!(auth.deletions(), 1);

        let readme = &parsed.files[1];
        assert_eq!(readme.path, "README.md");
        assert_eq!(readme.hunks[0].new_start, 10);
        assert_eq!(readme.changed_lines(), 2);
        assert_eq!(parsed.total_changed_lines(), 5);
    }

    #[test]
    fn removed_line_that_looks_like_a_header_stays_in_the_hunk() {
        let diff = "\
--- a/notes.txt
+++ b/notes.txt
@@ -1,2 +1,1 @@
--- not a header
 keep
";
        let parsed = parse_diff(diff);
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].deletions(), 1);
        assert_eq!(parsed.files[0].hunks[0].lines[0], "--- not a header");
    }

    #[test]
    fn plain_unified_diffs_split_on_minus_headers() {
        let diff = "\
--- a/one.txt
+++ b/one.txt
@@ -1 +1 @@
-a
+b
--- a/two.txt
+++ b/two.txt
@@ -1 +1 @@
-c
+d
";
        let summary = summarize_diff(diff);
        let paths: Vec<&str> = summary.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["one.txt", "two.txt"]);
        assert_eq!(summary[1].total_changes(), 2);
    }

    #[test]
    fn unparseable_hunks_are_skipped() {
        let diff = "\
diff --git a/x.rs b/x.rs
--- a/x.rs
+++ b/x.rs
@@ garbage @@
+lost
-lost
@@ -1 +1 @@
-kept
+kept2
";
        let parsed = parse_diff(diff);
        assert_eq!(parsed.skipped_hunks, 1);
        assert_eq!(parsed.files[0].hunks.len(), 1);
        assert_eq!(parsed.total_changed_lines(), 2);
    }

    #[test]
    fn deleted_file_keeps_old_path() {
        let diff = "\
diff --git a/old.cfg b/old.cfg
deleted file mode 100644
--- a/old.cfg
+++ /dev/null
@@ -1,2 +0,0 @@
-a=1
-b=2
";
        let parsed = parse_diff(diff);
        assert_eq!(parsed.files[0].path, "old.cfg");
        assert_eq!(parsed.files[0].deletions(), 2);
    }

    #[test]
    fn empty_input_is_empty() {
        assert_eq!(total_changed_lines(""), 0);
        assert!(summarize_diff("not a diff at all").is_empty());
    }
}
