use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TermId = u32;

/// One passage of one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Hex SHA-1 of `"{source}::{chunk_index}"`, stable across rebuilds.
    pub id: String,
    /// Corpus-relative path with `/` separators.
    pub source: String,
    pub chunk_index: u32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub count: u64,
    pub built_at_unix: i64,
}

/// Corpus-wide ranking statistics, computed once per full rebuild.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingStats {
    pub dictionary: HashMap<String, TermId>,
    /// Document frequency per term id: number of chunks containing the term.
    pub df: Vec<u32>,
    /// Per-chunk term frequencies, sorted by term id.
    pub chunk_terms: Vec<Vec<(TermId, u32)>>,
    /// Token count per chunk.
    pub chunk_lens: Vec<u32>,
    pub avgdl: f64,
}

impl RankingStats {
    /// Accumulate statistics from the token lists of every chunk, in chunk order.
    pub fn from_tokens<I, T>(token_lists: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = String>,
    {
        let mut stats = RankingStats::default();
        let mut total_len: u64 = 0;
        for tokens in token_lists {
            let mut tf_counts: HashMap<TermId, u32> = HashMap::new();
            let mut len = 0u32;
            for term in tokens {
                len += 1;
                let next_id = stats.dictionary.len() as TermId;
                let tid = *stats.dictionary.entry(term).or_insert(next_id);
                if stats.df.len() <= tid as usize {
                    stats.df.resize(tid as usize + 1, 0);
                }
                *tf_counts.entry(tid).or_insert(0) += 1;
            }
            // one df increment per distinct term in this chunk
            for tid in tf_counts.keys() {
                stats.df[*tid as usize] += 1;
            }
            let mut terms: Vec<(TermId, u32)> = tf_counts.into_iter().collect();
            terms.sort_by_key(|(tid, _)| *tid);
            stats.chunk_terms.push(terms);
            stats.chunk_lens.push(len);
            total_len += len as u64;
        }
        let n = stats.chunk_lens.len();
        stats.avgdl = if n == 0 { 0.0 } else { total_len as f64 / n as f64 };
        stats
    }

    pub fn num_chunks(&self) -> usize {
        self.chunk_lens.len()
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.dictionary.get(term).copied()
    }

    /// `ln((N - df + 0.5) / (df + 0.5) + 1)`; always positive.
    pub fn idf(&self, tid: TermId) -> f64 {
        let n = self.num_chunks() as f64;
        let df = self.df.get(tid as usize).copied().unwrap_or(0) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }
}

/// Immutable snapshot of the corpus: chunks in insertion order plus their ranking statistics.
///
/// Nothing mutates an `Index` after construction; a rebuild produces a new value.
#[derive(Debug, Clone)]
pub struct Index {
    chunks: Vec<Chunk>,
    stats: RankingStats,
    meta: IndexMetadata,
    /// term id -> (chunk position, tf), derived from `stats.chunk_terms`.
    postings: HashMap<TermId, Vec<(u32, u32)>>,
}

impl Index {
    /// Callers must pass one `chunk_terms`/`chunk_lens` entry per chunk, in the same order.
    pub fn new(chunks: Vec<Chunk>, stats: RankingStats, meta: IndexMetadata) -> Self {
        let mut postings: HashMap<TermId, Vec<(u32, u32)>> = HashMap::new();
        for (pos, terms) in stats.chunk_terms.iter().enumerate() {
            for &(tid, tf) in terms {
                postings.entry(tid).or_default().push((pos as u32, tf));
            }
        }
        Self { chunks, stats, meta, postings }
    }

    pub fn empty(built_at_unix: i64) -> Self {
        Self::new(Vec::new(), RankingStats::default(), IndexMetadata { count: 0, built_at_unix })
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn stats(&self) -> &RankingStats {
        &self.stats
    }

    pub fn meta(&self) -> IndexMetadata {
        self.meta
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn postings(&self, tid: TermId) -> &[(u32, u32)] {
        self.postings.get(&tid).map(Vec::as_slice).unwrap_or(&[])
    }
}
