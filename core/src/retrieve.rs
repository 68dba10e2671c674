use crate::index::Index;
use crate::tokenizer::tokenize;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const K1: f64 = 1.5;
pub const B: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub source: String,
    pub chunk_index: u32,
    pub text: String,
    pub score: f64,
}

/// Per-chunk scores for `query`, in chunk insertion order.
///
/// Every query token contributes, repeats included; tokens unknown to the index add nothing.
pub fn score_all(index: &Index, query: &str) -> Vec<f64> {
    let stats = index.stats();
    let mut scores = vec![0.0f64; index.len()];
    if index.is_empty() {
        return scores;
    }
    let avgdl = if stats.avgdl > 0.0 { stats.avgdl } else { 1.0 };
    for term in tokenize(query) {
        let Some(tid) = stats.term_id(&term) else { continue };
        let idf = stats.idf(tid);
        for &(pos, tf) in index.postings(tid) {
            let tf = tf as f64;
            let len = stats.chunk_lens[pos as usize] as f64;
            let norm = K1 * (1.0 - B + B * len / avgdl);
            scores[pos as usize] += idf * (tf * (K1 + 1.0)) / (tf + norm);
        }
    }
    scores
}

/// Top `k` chunks by descending score. Equal scores keep insertion order; zero-score
/// chunks are never returned.
pub fn retrieve(index: &Index, query: &str, k: usize) -> Vec<Hit> {
    if k == 0 || index.is_empty() {
        return Vec::new();
    }
    let scores = score_all(index, query);
    let mut ranked: Vec<(usize, f64)> = scores
        .into_iter()
        .enumerate()
        .filter(|(_, s)| *s > 0.0)
        .collect();
    // sort_by is stable, so ties stay in chunk order
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked
        .into_iter()
        .take(k)
        .map(|(pos, score)| {
            let chunk = &index.chunks()[pos];
            Hit { source: chunk.source.clone(), chunk_index: chunk.chunk_index, text: chunk.text.clone(), score }
        })
        .collect()
}
