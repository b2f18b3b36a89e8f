//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait defines the storage/query contract for chunk
//! embeddings, enabling pluggable backends: [`sqlite::SqliteIndex`] for
//! durable storage and [`memory::MemoryIndex`] for tests.
//!
//! Contract highlights:
//! - `add` inserts or replaces by composite key; re-adding an identical
//!   entry is a no-op observable effect.
//! - `delete` is idempotent; unknown keys are ignored.
//! - `query` orders hits by ascending cosine distance, returns at most `k`
//!   hits, and returns an empty vector (never an error) on an empty index.
//! - A query embedding of the wrong dimensionality is a caller-contract
//!   violation and fails fast.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ChunkMeta;

/// A chunk entry ready for indexing: composite key, embedding, raw text,
/// and metadata.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub embedding: Vec<f32>,
    pub text: String,
    pub meta: ChunkMeta,
}

/// A single nearest-neighbor hit.
#[derive(Debug, Clone)]
pub struct QueryHit {
    pub id: String,
    pub text: String,
    pub meta: ChunkMeta,
    /// Cosine distance to the query (smaller = more similar).
    pub distance: f32,
}

/// Durable mapping from composite chunk key to (embedding, text, metadata),
/// with nearest-neighbor search by cosine distance.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace entries by id. Idempotent per entry.
    async fn add(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Remove entries by composite key. Missing keys are not an error.
    async fn delete(&self, ids: &[String]) -> Result<()>;

    /// Nearest-neighbor query, closest first, at most `k` hits.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryHit>>;

    /// Total stored entries, for health and diagnostics.
    async fn count(&self) -> Result<i64>;
}

/// Shared dimensionality guard used by both backends.
pub(crate) fn check_dims(expected: usize, got: usize, what: &str) -> Result<()> {
    if expected != got {
        anyhow::bail!(
            "{} has dimensionality {} but the index stores {}-dimensional vectors",
            what,
            got,
            expected
        );
    }
    Ok(())
}
