use crate::chunker::{DEFAULT_CHUNK_CHARS, DEFAULT_OVERLAP_CHARS};
use crate::context::DEFAULT_MAX_CONTEXT_CHARS;
use crate::extract::Extractor;
use crate::builder::IndexBuilder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    pub corpus_dir: PathBuf,
    pub index_dir: PathBuf,
    pub chunk_chars: usize,
    pub overlap_chars: usize,
    pub top_k: usize,
    pub max_context_chars: usize,
    /// Tesseract-compatible OCR binary; empty disables OCR.
    pub ocr_command: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("./corpus"),
            index_dir: PathBuf::from("./index"),
            chunk_chars: DEFAULT_CHUNK_CHARS,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
            top_k: 5,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            ocr_command: "tesseract".to_string(),
        }
    }
}

impl RagConfig {
    /// Defaults overlaid with `RAG_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup("RAG_CORPUS_DIR") { cfg.corpus_dir = PathBuf::from(v); }
        if let Some(v) = lookup("RAG_INDEX_DIR") { cfg.index_dir = PathBuf::from(v); }
        if let Some(v) = lookup("RAG_OCR_COMMAND") { cfg.ocr_command = v; }
        parse_into(&lookup, "RAG_CHUNK_CHARS", &mut cfg.chunk_chars);
        parse_into(&lookup, "RAG_OVERLAP_CHARS", &mut cfg.overlap_chars);
        parse_into(&lookup, "RAG_TOP_K", &mut cfg.top_k);
        parse_into(&lookup, "RAG_MAX_CONTEXT_CHARS", &mut cfg.max_context_chars);
        cfg
    }

    pub fn extractor(&self) -> Extractor {
        Extractor::from_ocr_command(&self.ocr_command)
    }

    pub fn builder(&self) -> IndexBuilder {
        IndexBuilder::new(self.extractor()).chunking(self.chunk_chars, self.overlap_chars)
    }
}

fn parse_into<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else { return };
    match raw.trim().parse() {
        Ok(v) => *slot = v,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparsable config override"),
    }
}
