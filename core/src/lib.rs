//! Passage retrieval over a corpus of immigration-law documents.
//!
//! Build time: corpus files → [`extract`] → [`chunker`] → [`tokenizer`] →
//! [`builder::IndexBuilder`] → [`persist`]. Query time: [`retrieve`] against a
//! loaded [`Index`], then [`context::assemble`] for the downstream generator.
//! [`staleness`] decides when a persisted index must be rebuilt before serving.

pub mod builder;
pub mod chunker;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod handle;
mod index;
pub mod lifecycle;
pub mod persist;
pub mod retrieve;
pub mod staleness;
pub mod tokenizer;

pub use config::RagConfig;
pub use error::StoreError;
pub use handle::IndexHandle;
pub use index::*;
pub use lifecycle::{open_or_build, OpenOutcome, RebuildReason, SearchService};
pub use retrieve::Hit;
