use crate::error::StoreError;
use crate::index::{Chunk, Index, IndexMetadata, RankingStats, TermId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const STATS_VERSION: u32 = 1;

/// On-disk form of [`RankingStats`]. Bumping `STATS_VERSION` invalidates older indexes.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsFile {
    pub version: u32,
    pub dictionary: HashMap<String, TermId>,
    pub df: Vec<u32>,
    pub chunk_terms: Vec<Vec<(TermId, u32)>>,
    pub chunk_lens: Vec<u32>,
    pub avgdl: f64,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn items(&self) -> PathBuf { self.root.join("items.jsonl") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    /// The artifact whose mtime marks when the index was last built.
    pub fn stats(&self) -> PathBuf { self.root.join("stats.bin") }
}

/// Write `path` through a uniquely named temporary sibling and rename it into place.
fn write_atomic<F>(path: &Path, write: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<(), StoreError>,
{
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        write(&mut w)?;
        w.flush()?;
    }
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

fn corrupt(path: &Path, reason: impl ToString) -> StoreError {
    StoreError::Corrupt { path: path.to_path_buf(), reason: reason.to_string() }
}

fn open_artifact(path: &Path) -> Result<File, StoreError> {
    File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StoreError::Missing { path: path.to_path_buf() },
        _ => corrupt(path, e),
    })
}

/// Persist every artifact; `stats.bin` goes last so its presence implies a complete index.
pub fn save_index(paths: &IndexPaths, index: &Index) -> Result<(), StoreError> {
    create_dir_all(&paths.root)?;
    save_items(paths, index.chunks())?;
    save_meta(paths, &index.meta())?;
    save_stats(paths, index.stats())?;
    tracing::info!(dir = %paths.root.display(), count = index.len(), "index saved");
    Ok(())
}

pub fn save_items(paths: &IndexPaths, chunks: &[Chunk]) -> Result<(), StoreError> {
    write_atomic(&paths.items(), |w| {
        for chunk in chunks {
            serde_json::to_writer(&mut *w, chunk).map_err(|e| StoreError::Io(e.into()))?;
            w.write_all(b"\n")?;
        }
        Ok(())
    })
}

pub fn save_meta(paths: &IndexPaths, meta: &IndexMetadata) -> Result<(), StoreError> {
    write_atomic(&paths.meta(), |w| {
        serde_json::to_writer_pretty(&mut *w, meta).map_err(|e| StoreError::Io(e.into()))?;
        Ok(())
    })
}

pub fn save_stats(paths: &IndexPaths, stats: &RankingStats) -> Result<(), StoreError> {
    let file = StatsFile {
        version: STATS_VERSION,
        dictionary: stats.dictionary.clone(),
        df: stats.df.clone(),
        chunk_terms: stats.chunk_terms.clone(),
        chunk_lens: stats.chunk_lens.clone(),
        avgdl: stats.avgdl,
    };
    let bytes = bincode::serialize(&file).map_err(|e| StoreError::Io(std::io::Error::new(ErrorKind::Other, e)))?;
    write_atomic(&paths.stats(), |w| {
        w.write_all(&bytes)?;
        Ok(())
    })
}

pub fn load_items(paths: &IndexPaths) -> Result<Vec<Chunk>, StoreError> {
    let path = paths.items();
    let reader = BufReader::new(open_artifact(&path)?);
    let mut chunks = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| corrupt(&path, e))?;
        if line.trim().is_empty() { continue; }
        let chunk: Chunk = serde_json::from_str(&line)
            .map_err(|e| corrupt(&path, format!("line {}: {}", lineno + 1, e)))?;
        chunks.push(chunk);
    }
    Ok(chunks)
}

pub fn load_meta(paths: &IndexPaths) -> Result<IndexMetadata, StoreError> {
    let path = paths.meta();
    let reader = BufReader::new(open_artifact(&path)?);
    serde_json::from_reader(reader).map_err(|e| corrupt(&path, e))
}

pub fn load_stats(paths: &IndexPaths) -> Result<RankingStats, StoreError> {
    let path = paths.stats();
    let reader = BufReader::new(open_artifact(&path)?);
    let file: StatsFile = bincode::deserialize_from(reader).map_err(|e| corrupt(&path, e))?;
    if file.version != STATS_VERSION {
        return Err(StoreError::VersionMismatch { found: file.version, expected: STATS_VERSION });
    }
    if file.chunk_terms.len() != file.chunk_lens.len() {
        return Err(corrupt(&path, "term table and length table disagree"));
    }
    Ok(RankingStats {
        dictionary: file.dictionary,
        df: file.df,
        chunk_terms: file.chunk_terms,
        chunk_lens: file.chunk_lens,
        avgdl: file.avgdl,
    })
}

/// Load a complete index; any absent, unparsable or inconsistent artifact is an error.
pub fn load_index(paths: &IndexPaths) -> Result<Index, StoreError> {
    let stats = load_stats(paths)?;
    let meta = load_meta(paths)?;
    let chunks = load_items(paths)?;
    if chunks.len() as u64 != meta.count {
        return Err(corrupt(&paths.items(), format!("{} records, metadata says {}", chunks.len(), meta.count)));
    }
    if stats.num_chunks() != chunks.len() {
        return Err(corrupt(&paths.stats(), format!("stats cover {} chunks, found {}", stats.num_chunks(), chunks.len())));
    }
    Ok(Index::new(chunks, stats, meta))
}
