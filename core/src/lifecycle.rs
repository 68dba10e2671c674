//! Startup and rebuild policy: load the persisted index when it is fresh and
//! intact, otherwise rebuild from the corpus, persist, and serve the new one.

use crate::config::RagConfig;
use crate::context::assemble;
use crate::handle::IndexHandle;
use crate::index::Index;
use crate::persist::{load_index, save_index, IndexPaths};
use crate::retrieve::{retrieve, Hit};
use crate::staleness::{self, Staleness};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
    Staleness(Staleness),
    Unloadable(String),
    Requested,
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildReason::Staleness(s) => write!(f, "{}", s),
            RebuildReason::Unloadable(e) => write!(f, "persisted index unusable: {}", e),
            RebuildReason::Requested => f.write_str("rebuild requested"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenOutcome {
    Loaded,
    Built(RebuildReason),
}

/// Build from the corpus and persist. The returned index is complete before anyone can see it.
///
/// A failed save only loses persistence: the built index is still returned and the
/// next startup rebuilds again.
pub fn rebuild(config: &RagConfig, reason: RebuildReason) -> Index {
    tracing::info!(reason = %reason, corpus = %config.corpus_dir.display(), "building index");
    let index = config.builder().build(&config.corpus_dir);
    if let Err(e) = save_index(&IndexPaths::new(&config.index_dir), &index) {
        tracing::warn!(dir = %config.index_dir.display(), error = %e, "could not persist index, serving it from memory");
    }
    index
}

/// Build and persist, failing when the index can not be written.
pub fn build_and_save(config: &RagConfig) -> Result<Index> {
    let index = config.builder().build(&config.corpus_dir);
    save_index(&IndexPaths::new(&config.index_dir), &index)
        .with_context(|| format!("saving index to {}", config.index_dir.display()))?;
    Ok(index)
}

pub fn open_or_build(config: &RagConfig) -> Result<(Index, OpenOutcome)> {
    let status = staleness::check(&config.corpus_dir, &config.index_dir);
    if status.needs_rebuild() {
        let reason = RebuildReason::Staleness(status);
        let index = rebuild(config, reason.clone());
        return Ok((index, OpenOutcome::Built(reason)));
    }
    match load_index(&IndexPaths::new(&config.index_dir)) {
        Ok(index) => {
            tracing::info!(count = index.len(), "loaded persisted index");
            Ok((index, OpenOutcome::Loaded))
        }
        Err(e) if e.needs_rebuild() => {
            tracing::warn!(error = %e, "persisted index unusable, rebuilding");
            let reason = RebuildReason::Unloadable(e.to_string());
            let index = rebuild(config, reason.clone());
            Ok((index, OpenOutcome::Built(reason)))
        }
        Err(e) => Err(e).context("loading persisted index"),
    }
}

/// What a serving layer holds: the swappable index plus retrieval settings.
///
/// Clones share the index and the rebuild lock, so at most one build, save and swap
/// runs at a time.
#[derive(Clone)]
pub struct SearchService {
    handle: IndexHandle,
    config: RagConfig,
    rebuild_lock: Arc<Mutex<()>>,
}

impl SearchService {
    pub fn open(config: RagConfig) -> Result<(Self, OpenOutcome)> {
        let (index, outcome) = open_or_build(&config)?;
        let service = Self { handle: IndexHandle::new(index), config, rebuild_lock: Arc::new(Mutex::new(())) };
        Ok((service, outcome))
    }

    pub fn handle(&self) -> &IndexHandle {
        &self.handle
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn retrieve(&self, query: &str, k: usize) -> Vec<Hit> {
        retrieve(&self.handle.current(), query, k)
    }

    /// Context block for `query` using the configured `top_k` and character budget.
    pub fn context(&self, query: &str) -> (Vec<Hit>, String) {
        let hits = self.retrieve(query, self.config.top_k);
        let ctx = assemble(&hits, self.config.max_context_chars);
        (hits, ctx)
    }

    /// Full rebuild off to the side, then swap. Reads already in flight keep the old index.
    pub fn rebuild(&self) {
        let _guard = self.rebuild_lock.lock();
        let index = rebuild(&self.config, RebuildReason::Requested);
        self.handle.replace(index);
    }

    /// Rebuild only when the corpus is newer than the persisted index. Returns whether it did.
    pub fn refresh_if_stale(&self) -> bool {
        let _guard = self.rebuild_lock.lock();
        // checked under the lock so a build that just finished is not repeated
        let status = staleness::check(&self.config.corpus_dir, &self.config.index_dir);
        if !status.needs_rebuild() {
            return false;
        }
        let index = rebuild(&self.config, RebuildReason::Staleness(status));
        self.handle.replace(index);
        true
    }
}
