//! Core data models for the ingestion and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A bounded, possibly overlapping window of a document's extracted text.
///
/// `start` and `end` are character offsets into the *original* text
/// (half-open `[start, end)`), even when whitespace-only windows between
/// chunks were dropped. `index` is the 0-based emission order.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: i64,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Metadata stored alongside every indexed chunk and echoed back in
/// retrieval results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkMeta {
    pub doc_id: i64,
    pub chunk_index: i64,
    pub filename: String,
}

impl ChunkMeta {
    /// Composite key uniquely naming a chunk across the whole index.
    pub fn key(&self) -> String {
        chunk_key(self.doc_id, self.chunk_index)
    }
}

/// Render the composite chunk key for `(document id, chunk index)`.
pub fn chunk_key(doc_id: i64, chunk_index: i64) -> String {
    format!("{}:{}", doc_id, chunk_index)
}

/// A registered document. Immutable after registration; removed only by
/// explicit deletion, which cascades to the vector index.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub id: i64,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub file_type: String,
    pub word_count: usize,
    pub char_count: usize,
    pub chunk_count: usize,
    pub preview: String,
    /// Explicit chunk-key list, recorded atomically with registration.
    /// Deletion hands this set to the vector index rather than recomputing
    /// keys from the chunk count.
    #[serde(skip)]
    pub chunk_keys: Vec<String>,
}

/// A single retrieval hit: chunk text, its metadata, and the cosine
/// distance to the query. Ephemeral — produced per query, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub text: String,
    pub meta: ChunkMeta,
    pub distance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_key_format() {
        assert_eq!(chunk_key(7, 0), "7:0");
        let meta = ChunkMeta {
            doc_id: 12,
            chunk_index: 3,
            filename: "notes.txt".to_string(),
        };
        assert_eq!(meta.key(), "12:3");
    }
}
