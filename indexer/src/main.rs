use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rag_core::context::assemble;
use rag_core::lifecycle::build_and_save;
use rag_core::persist::{load_meta, IndexPaths};
use rag_core::staleness;
use rag_core::{open_or_build, RagConfig};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the passage index over the immigration-law corpus", long_about = None)]
struct Cli {
    #[command(flatten)]
    dirs: DirArgs,
    #[command(subcommand)]
    command: Commands,
}

/// Overrides for RAG_CORPUS_DIR / RAG_INDEX_DIR.
#[derive(Args)]
struct DirArgs {
    /// Corpus directory
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,
    /// Index directory
    #[arg(long, global = true)]
    index: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full re-index of the corpus
    Build {
        #[arg(long)]
        chunk_chars: Option<usize>,
        #[arg(long)]
        overlap_chars: Option<usize>,
        /// Tesseract-compatible OCR binary; pass "" to disable
        #[arg(long)]
        ocr_command: Option<String>,
    },
    /// Report whether the persisted index must be rebuilt
    Status,
    /// Print index metadata
    Meta,
    /// Rank passages for a query (rebuilds first if stale)
    Search {
        query: String,
        #[arg(short, long)]
        k: Option<usize>,
        /// Emit hits as JSON lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the context block that would be handed to the generator
    Context {
        query: String,
        #[arg(short, long)]
        k: Option<usize>,
        #[arg(long)]
        max_chars: Option<usize>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let mut config = RagConfig::from_env();
    if let Some(c) = cli.dirs.corpus { config.corpus_dir = c; }
    if let Some(i) = cli.dirs.index { config.index_dir = i; }

    match cli.command {
        Commands::Build { chunk_chars, overlap_chars, ocr_command } => {
            if let Some(v) = chunk_chars { config.chunk_chars = v; }
            if let Some(v) = overlap_chars { config.overlap_chars = v; }
            if let Some(v) = ocr_command { config.ocr_command = v; }
            let index = build_and_save(&config)?;
            println!("indexed {} chunks into {}", index.len(), config.index_dir.display());
            Ok(())
        }
        Commands::Status => {
            let status = staleness::check(&config.corpus_dir, &config.index_dir);
            println!("{} (needs_rebuild={})", status, status.needs_rebuild());
            Ok(())
        }
        Commands::Meta => {
            let meta = load_meta(&IndexPaths::new(&config.index_dir))
                .with_context(|| format!("reading metadata from {}", config.index_dir.display()))?;
            let built = time::OffsetDateTime::from_unix_timestamp(meta.built_at_unix)
                .ok()
                .and_then(|t| t.format(&time::format_description::well_known::Rfc3339).ok())
                .unwrap_or_else(|| "unknown".into());
            println!("count: {}\nbuilt_at_unix: {} ({})", meta.count, meta.built_at_unix, built);
            Ok(())
        }
        Commands::Search { query, k, json } => {
            let (index, outcome) = open_or_build(&config)?;
            tracing::debug!(?outcome, "index ready");
            let hits = rag_core::retrieve::retrieve(&index, &query, k.unwrap_or(config.top_k));
            if hits.is_empty() {
                println!("no relevant passages");
            }
            for hit in &hits {
                if json {
                    println!("{}", serde_json::to_string(hit)?);
                } else {
                    println!("{:>8.4}  {}#{}", hit.score, hit.source, hit.chunk_index);
                }
            }
            Ok(())
        }
        Commands::Context { query, k, max_chars } => {
            let (index, _) = open_or_build(&config)?;
            let hits = rag_core::retrieve::retrieve(&index, &query, k.unwrap_or(config.top_k));
            println!("{}", assemble(&hits, max_chars.unwrap_or(config.max_context_chars)));
            Ok(())
        }
    }
}
