use std::path::PathBuf;

/// Failures loading or saving a persisted index.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("index artifact missing: {}", path.display())]
    Missing { path: PathBuf },

    #[error("index artifact corrupt: {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("ranking stats version {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True for the "missing or corrupt index" class, which callers answer with a full rebuild.
    pub fn needs_rebuild(&self) -> bool {
        !matches!(self, StoreError::Io(_))
    }
}
