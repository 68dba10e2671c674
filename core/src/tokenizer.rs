use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_TERM: Regex = Regex::new(r"[^a-z0-9]+").expect("valid regex");
}

/// Tokenize text into index terms: lowercase, split on every run of characters outside `[a-z0-9]`.
///
/// No stemming and no stopword removal; the same input always yields the same terms.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_TERM
        .replace_all(&lowered, " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
