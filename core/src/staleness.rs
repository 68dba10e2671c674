use crate::persist::IndexPaths;
use std::fmt;
use std::path::Path;
use std::time::SystemTime;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// No persisted index artifact.
    Missing,
    /// Some corpus entry was modified after the index artifact.
    Stale,
    Fresh,
}

impl Staleness {
    pub fn needs_rebuild(self) -> bool {
        !matches!(self, Staleness::Fresh)
    }
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Staleness::Missing => "index missing",
            Staleness::Stale => "corpus changed since last build",
            Staleness::Fresh => "index up to date",
        };
        f.write_str(s)
    }
}

/// Newest modification time of any entry under `corpus_dir`, directories included,
/// so deletions also register.
pub fn corpus_mtime(corpus_dir: &Path) -> Option<SystemTime> {
    WalkDir::new(corpus_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter_map(|m| m.modified().ok())
        .max()
}

pub fn check(corpus_dir: &Path, index_dir: &Path) -> Staleness {
    let artifact = IndexPaths::new(index_dir).stats();
    let index_mtime = match artifact.metadata().and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return Staleness::Missing,
    };
    match corpus_mtime(corpus_dir) {
        Some(t) if t > index_mtime => Staleness::Stale,
        _ => Staleness::Fresh,
    }
}

/// Conservative: any touch newer than the index forces a full rebuild, content change or not.
pub fn needs_rebuild(corpus_dir: &Path, index_dir: &Path) -> bool {
    check(corpus_dir, index_dir).needs_rebuild()
}
