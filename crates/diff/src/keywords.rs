//! Intent keywords: plain tokenisation plus a stopword list, no NLP.

const STOPWORDS: &[&str] = &[
    // function words
    "the", "and", "for", "this", "that", "into", "with", "from", "when", "then", "than", "also",
    "some", "more", "less", "just", "only", "were", "been", "have", "after", "before", "should",
    // generic change verbs
    "add", "adds", "added", "fix", "fixes", "fixed", "update", "updates", "updated", "refactor",
    "improve", "improves", "change", "changes", "changed", "remove", "removed", "make", "wip",
    "cleanup", "tweak", "tweaks", "bump", "merge", "pull", "request", "branch",
    // filler nouns
    "stuff", "things", "thing", "misc", "minor", "various", "code", "files", "file", "work",
    // conventional commit types
    "feat", "chore", "docs", "style", "perf", "build", "test", "tests", "revert",
];

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Distinct lowercase tokens from `messages`, in first-seen order, at most
/// `max_keywords`. Empty or generic messages yield an empty list.
pub fn extract_intent_keywords<S: AsRef<str>>(
    messages: &[S],
    max_keywords: usize,
    min_len: usize,
) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for message in messages {
        for raw in message.as_ref().split(|c: char| !is_token_char(c)) {
            if keywords.len() >= max_keywords {
                return keywords;
            }
            let word = raw.trim_matches('-').to_lowercase();
            if word.chars().count() < min_len
                || word.chars().all(|c| c.is_ascii_digit())
                || STOPWORDS.contains(&word.as_str())
                || keywords.contains(&word)
            {
                continue;
            }
            keywords.push(word);
        }
    }
    keywords
}
