//! # docrag CLI
//!
//! Commands for initializing the vector store, inspecting how a document
//! will be chunked, and running the HTTP server.
//!
//! ```bash
//! docrag init                          # create the SQLite vector store
//! docrag inspect ./paper.pdf           # preview extraction + chunking
//! docrag serve                         # start the HTTP API
//! ```
//!
//! All commands accept `--config` pointing to a TOML configuration file.
//! The document catalog lives in server memory, so uploads, listing,
//! deletion, search, and chat go through the HTTP API of a running
//! `docrag serve` process.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docrag::chunk::chunk_text;
use docrag::extract::{extract_text, file_extension};
use docrag::{config, db, migrate, server};

/// docrag — a document-grounded retrieval backend for conversational
/// assistants.
#[derive(Parser)]
#[command(
    name = "docrag",
    about = "Document-grounded retrieval backend for conversational assistants",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the SQLite vector store.
    ///
    /// Creates the database file and schema. Idempotent — running it
    /// multiple times is safe.
    Init,

    /// Preview how a document would be extracted and chunked.
    ///
    /// Extracts text from the file and prints chunk statistics without
    /// embedding or writing anything.
    Inspect {
        /// Path to a .pdf, .docx, .txt, or .md file.
        path: PathBuf,
    },

    /// Start the HTTP API server.
    ///
    /// Binds to `[server].bind` and serves upload, search, chat, and
    /// health endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Vector store initialized at {}", cfg.db.path.display());
        }
        Commands::Inspect { path } => {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("document");
            let ext = file_extension(filename);
            let bytes = std::fs::read(&path)?;
            let text = extract_text(&bytes, &ext)?;
            let chunks = chunk_text(&text, cfg.chunking.chunk_size, cfg.chunking.overlap);

            println!("inspect {}", path.display());
            println!("  type: {}", ext);
            println!("  characters: {}", text.chars().count());
            println!("  words: {}", text.split_whitespace().count());
            println!("  chunks: {}", chunks.len());
            if let Some(first) = chunks.first() {
                let preview: String = first.text.chars().take(120).collect();
                println!("  first chunk [{}..{}]: {:?}", first.start, first.end, preview);
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
