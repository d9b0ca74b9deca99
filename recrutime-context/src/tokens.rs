//! Tokenization shared by index building and query vectorization.
//!
//! A token is a maximal run of alphanumeric characters, case-folded to lowercase.
//! Everything else (punctuation, whitespace, symbols) separates tokens.

use regex::Regex;
use std::sync::LazyLock;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{Alphabetic}\p{N}]+").unwrap());

/// Splits `text` into lowercase alphanumeric tokens, in order of appearance.
///
/// # Examples
///
/// ```
/// use recrutime_context::tokenize;
///
/// assert_eq!(
///     tokenize("Rust 2024: async/await, Tokio!"),
///     vec!["rust", "2024", "async", "await", "tokio"]
/// );
/// assert!(tokenize("--- ... !!!").is_empty());
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}
