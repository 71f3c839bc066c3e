//! Lowercasing word tokenizer

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

static TOKENIZE_RE: OnceLock<Regex> = OnceLock::new();
static STOP_SET: OnceLock<HashSet<&'static str>> = OnceLock::new();

static STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "if",
    "in", "into", "is", "it", "its", "no", "not", "of", "on", "or", "so", "such", "that", "the",
    "their", "then", "there", "these", "they", "this", "to", "was", "were", "will", "with",
];

/// Split `text` into lowercase word tokens, keeping duplicates and order
pub fn tokenize(text: &str) -> Vec<String> {
    let re = TOKENIZE_RE.get_or_init(|| Regex::new(r"\w+").expect("static pattern compiles"));
    re.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_SET
        .get_or_init(|| STOP_WORDS.iter().copied().collect())
        .contains(token)
}
