//! Fixed-size overlapping passage splitter.
//!
//! Windows are measured in characters (Unicode scalar values), never bytes, so a
//! window boundary can not land inside a multi-byte character.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EXCESS_BLANK_LINES: Regex = Regex::new(r"\n{3,}").expect("valid regex");
}

pub const DEFAULT_CHUNK_CHARS: usize = 1600;
pub const DEFAULT_OVERLAP_CHARS: usize = 240;

/// Normalize line endings, collapse 3+ newlines to a blank line, trim.
pub fn normalize(text: &str) -> String {
    let unix = text.replace("\r\n", "\n");
    EXCESS_BLANK_LINES.replace_all(&unix, "\n\n").trim().to_string()
}

/// Character ranges `[start, end)` of each window over `len` characters.
///
/// Consecutive windows start `chunk_chars - overlap_chars` apart; the advance is
/// clamped to 1 so the walk terminates for any overlap.
pub fn window_ranges(len: usize, chunk_chars: usize, overlap_chars: usize) -> Vec<(usize, usize)> {
    let chunk_chars = chunk_chars.max(1);
    let step = chunk_chars.saturating_sub(overlap_chars).max(1);
    let mut ranges = Vec::new();
    let mut start = 0usize;
    while start < len {
        let end = (start + chunk_chars).min(len);
        ranges.push((start, end));
        if end >= len {
            break;
        }
        start += step;
    }
    ranges
}

/// Split text into overlapping passages of at most `chunk_chars` characters.
///
/// Each window is trimmed; windows that trim to nothing are dropped. Empty input
/// yields no chunks.
pub fn chunk_text(text: &str, chunk_chars: usize, overlap_chars: usize) -> Vec<String> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Vec::new();
    }
    // Byte offset of every char boundary, plus the end.
    let mut bounds: Vec<usize> = normalized.char_indices().map(|(i, _)| i).collect();
    bounds.push(normalized.len());
    let n_chars = bounds.len() - 1;

    window_ranges(n_chars, chunk_chars, overlap_chars)
        .into_iter()
        .filter_map(|(s, e)| {
            let piece = normalized[bounds[s]..bounds[e]].trim();
            (!piece.is_empty()).then(|| piece.to_string())
        })
        .collect()
}
