//! Keyword summaries for task bodies and commit messages.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Default number of keywords kept in a summary.
pub const DEFAULT_KEYWORD_LIMIT: usize = 20;

const STOPWORDS_TEXT: &str = include_str!("../defaults/stopwords.txt");

static STOPWORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOPWORDS_TEXT.split_whitespace().collect());

// Mentions, URLs, punctuation and underscores all become separators.
static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@\w+|https?://\S+|[^\w\s]|_").expect("noise pattern is valid")
});

/// Whether a lowercase word is an English stopword.
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Reduce free text to its `limit` most frequent meaningful words.
///
/// The text is lowercased, mentions/URLs/punctuation are stripped, stopwords
/// and tokens that are not purely alphabetic are dropped. Ties keep the order
/// of first occurrence. The result is space-separated.
pub fn summarize(text: &str, limit: usize) -> String {
    let lowered = text.to_lowercase();
    let cleaned = NOISE.replace_all(&lowered, " ");

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in cleaned.split_whitespace() {
        if is_stopword(token) || !token.chars().all(char::is_alphabetic) {
            continue;
        }
        let count = counts.entry(token).or_insert(0);
        if *count == 0 {
            order.push(token);
        }
        *count += 1;
    }

    // Stable sort keeps first-occurrence order among equal counts.
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.truncate(limit);
    order.join(" ")
}
