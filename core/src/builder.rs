use crate::chunker::{chunk_text, DEFAULT_CHUNK_CHARS, DEFAULT_OVERLAP_CHARS};
use crate::extract::Extractor;
use crate::index::{Chunk, Index, IndexMetadata, RankingStats};
use crate::tokenizer::tokenize;
use sha1::{Digest, Sha1};
use std::path::Path;
use walkdir::WalkDir;

/// Deterministic chunk identity: hex SHA-1 of `"{source}::{chunk_index}"`.
pub fn chunk_id(source: &str, chunk_index: u32) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("{}::{}", source, chunk_index).as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct IndexBuilder {
    extractor: Extractor,
    chunk_chars: usize,
    overlap_chars: usize,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new(Extractor::new())
    }
}

impl IndexBuilder {
    pub fn new(extractor: Extractor) -> Self {
        Self { extractor, chunk_chars: DEFAULT_CHUNK_CHARS, overlap_chars: DEFAULT_OVERLAP_CHARS }
    }

    pub fn chunking(mut self, chunk_chars: usize, overlap_chars: usize) -> Self {
        self.chunk_chars = chunk_chars;
        self.overlap_chars = overlap_chars;
        self
    }

    /// Full re-index of `corpus_dir`. A missing or empty corpus yields an empty index.
    pub fn build(&self, corpus_dir: &Path) -> Index {
        let built_at_unix = time::OffsetDateTime::now_utc().unix_timestamp();
        if !corpus_dir.is_dir() {
            tracing::warn!(corpus = %corpus_dir.display(), "corpus directory missing, building empty index");
            return Index::empty(built_at_unix);
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut files = 0usize;
        let walker = WalkDir::new(corpus_dir).sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "corpus walk error, skipping entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            files += 1;
            let path = entry.path();
            let text = self.extractor.extract(path);
            if text.is_empty() {
                continue;
            }
            let source = relative_source(corpus_dir, path);
            let pieces = chunk_text(&text, self.chunk_chars, self.overlap_chars);
            tracing::debug!(source = %source, chunks = pieces.len(), "chunked file");
            for (k, piece) in pieces.into_iter().enumerate() {
                let chunk_index = k as u32;
                chunks.push(Chunk { id: chunk_id(&source, chunk_index), source: source.clone(), chunk_index, text: piece });
            }
        }

        let stats = RankingStats::from_tokens(chunks.iter().map(|c| tokenize(&c.text)));
        tracing::info!(files, chunks = chunks.len(), terms = stats.dictionary.len(), "index built");
        let meta = IndexMetadata { count: chunks.len() as u64, built_at_unix };
        Index::new(chunks, stats, meta)
    }
}

fn relative_source(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn chunk_id_is_stable_sha1() {
        assert_eq!(chunk_id("A.txt", 0), chunk_id("A.txt", 0));
        assert_ne!(chunk_id("A.txt", 0), chunk_id("A.txt", 1));
        assert_eq!(chunk_id("A.txt", 0).len(), 40);
    }

    #[test]
    fn nested_files_use_slash_sources_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("uscis/vol2")).unwrap();
        fs::write(dir.path().join("uscis/vol2/part-b.txt"), "specialty occupation").unwrap();
        fs::write(dir.path().join("a.txt"), "labor condition application").unwrap();
        fs::write(dir.path().join("notes.docx"), "ignored").unwrap();

        let index = IndexBuilder::default().build(dir.path());
        let sources: Vec<&str> = index.chunks().iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["a.txt", "uscis/vol2/part-b.txt"]);
        assert_eq!(index.meta().count, 2);
    }

    #[test]
    fn chunk_indices_are_source_local() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("long.txt"), "x".repeat(25)).unwrap();
        fs::write(dir.path().join("short.txt"), "y").unwrap();
        let index = IndexBuilder::default().chunking(10, 3).build(dir.path());
        let pairs: Vec<(&str, u32)> = index.chunks().iter().map(|c| (c.source.as_str(), c.chunk_index)).collect();
        assert_eq!(pairs, vec![("long.txt", 0), ("long.txt", 1), ("long.txt", 2), ("long.txt", 3), ("short.txt", 0)]);
        assert_eq!(index.stats().num_chunks(), 5);
    }

    #[test]
    fn missing_corpus_builds_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = IndexBuilder::default().build(&dir.path().join("nope"));
        assert_eq!(index.meta().count, 0);
    }
}
