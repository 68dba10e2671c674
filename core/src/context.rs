use crate::retrieve::Hit;

pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 8000;
const SEPARATOR: &str = "\n\n";

pub fn render_block(hit: &Hit) -> String {
    format!("SOURCE FILE: {}  CHUNK: {}\n{}", hit.source, hit.chunk_index, hit.text.trim())
}

/// Render hits in rank order, stopping before the first block that would push the
/// output past `max_chars` characters. Blocks are never cut.
pub fn assemble(hits: &[Hit], max_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for hit in hits {
        let block = render_block(hit);
        let sep = if out.is_empty() { 0 } else { SEPARATOR.len() };
        let block_chars = block.chars().count();
        if used + sep + block_chars > max_chars {
            break;
        }
        if sep > 0 {
            out.push_str(SEPARATOR);
        }
        out.push_str(&block);
        used += sep + block_chars;
    }
    out
}
