//! Retrieval planning: query string → ranked chunks.
//!
//! Embeds the query once and delegates ranking entirely to the vector
//! index's cosine-distance ordering. No re-ranking and no per-document
//! deduplication — several chunks of one source may legitimately appear.

use anyhow::Result;

use crate::embedding::{embed_query, Embedder};
use crate::index::VectorIndex;
use crate::models::RetrievalResult;

/// Default number of chunks handed to the context composer.
pub const DEFAULT_TOP_K: usize = 3;

/// Return the `k` chunks closest to `query`.
///
/// When `catalog_nonempty` is false the embedder and index are not touched
/// at all: nothing is indexed, so the only correct answer is "no context",
/// and skipping the model call keeps that answer deterministic and free.
pub async fn retrieve(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    query: &str,
    k: usize,
    catalog_nonempty: bool,
) -> Result<Vec<RetrievalResult>> {
    if !catalog_nonempty {
        return Ok(Vec::new());
    }

    let query_vec = embed_query(embedder, query).await?;
    let hits = index.query(&query_vec, k).await?;

    Ok(hits
        .into_iter()
        .map(|h| RetrievalResult {
            text: h.text,
            meta: h.meta,
            distance: h.distance,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::MemoryIndex;
    use crate::index::{IndexEntry, VectorIndex};
    use crate::models::{chunk_key, ChunkMeta};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embedder stub that counts calls and maps known strings to fixed
    /// vectors.
    struct StubEmbedder {
        calls: AtomicUsize,
    }

    impl StubEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl crate::embedding::Embedder for StubEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| match t.as_str() {
                    "east" => vec![1.0, 0.0],
                    "north" => vec![0.0, 1.0],
                    _ => vec![0.7, 0.7],
                })
                .collect())
        }

        fn dims(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn entry(doc_id: i64, chunk_index: i64, embedding: Vec<f32>, text: &str) -> IndexEntry {
        IndexEntry {
            id: chunk_key(doc_id, chunk_index),
            embedding,
            text: text.to_string(),
            meta: ChunkMeta {
                doc_id,
                chunk_index,
                filename: "doc.txt".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_empty_catalog_short_circuits() {
        let embedder = StubEmbedder::new();
        let index = MemoryIndex::new(2);
        index
            .add(vec![entry(1, 0, vec![1.0, 0.0], "stale")])
            .await
            .unwrap();

        let results = retrieve(&embedder, &index, "east", 3, false).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(embedder.call_count(), 0, "embedder must not be invoked");
    }

    #[tokio::test]
    async fn test_retrieve_ranks_by_distance() {
        let embedder = StubEmbedder::new();
        let index = MemoryIndex::new(2);
        index
            .add(vec![
                entry(1, 0, vec![0.0, 1.0], "north text"),
                entry(1, 1, vec![1.0, 0.0], "east text"),
            ])
            .await
            .unwrap();

        let results = retrieve(&embedder, &index, "east", 2, true).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "east text");
        assert!(results[0].distance <= results[1].distance);
        assert_eq!(embedder.call_count(), 1, "query embedded exactly once");
    }

    #[tokio::test]
    async fn test_retrieve_caps_at_k() {
        let embedder = StubEmbedder::new();
        let index = MemoryIndex::new(2);
        index
            .add(vec![
                entry(1, 0, vec![1.0, 0.0], "a"),
                entry(1, 1, vec![0.9, 0.1], "b"),
                entry(2, 0, vec![0.8, 0.2], "c"),
            ])
            .await
            .unwrap();

        let results = retrieve(&embedder, &index, "east", 2, true).await.unwrap();
        assert_eq!(results.len(), 2);
    }
}
