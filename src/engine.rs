//! Pipeline orchestration: the core API behind the HTTP and CLI surfaces.
//!
//! Coordinates chunking, embedding, the vector index, and the document
//! catalog. All mutations are all-or-nothing at the document boundary: a
//! failed embed or index write rolls back any entries already written and
//! the document is never registered.

use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::{DocumentCatalog, NewDocument};
use crate::chunk::chunk_text;
use crate::compose::{compose, BASE_SYSTEM_PROMPT};
use crate::config::{ChunkingConfig, RetrievalConfig};
use crate::embedding::Embedder;
use crate::error::EngineError;
use crate::index::{IndexEntry, VectorIndex};
use crate::models::{chunk_key, ChunkMeta, DocumentRecord, RetrievalResult};
use crate::retrieve::retrieve;

/// Characters of extracted text kept as the document preview.
const PREVIEW_CHARS: usize = 200;

/// Snapshot of pipeline state for diagnostics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub document_count: usize,
    pub embedding_count: i64,
}

/// The chunking/retrieval pipeline, shared across request handlers.
pub struct Engine {
    catalog: Arc<DocumentCatalog>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
    retrieval: RetrievalConfig,
    embed_batch_size: usize,
}

impl Engine {
    pub fn new(
        catalog: Arc<DocumentCatalog>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        chunking: ChunkingConfig,
        retrieval: RetrievalConfig,
        embed_batch_size: usize,
    ) -> Self {
        Self {
            catalog,
            index,
            embedder,
            chunking,
            retrieval,
            embed_batch_size,
        }
    }

    /// Wire up the production pipeline: SQLite-backed index plus the
    /// configured embedding provider.
    pub async fn from_config(config: &crate::config::Config) -> anyhow::Result<Self> {
        let pool = crate::db::connect(&config.db.path).await?;
        crate::migrate::run_migrations(&pool).await?;

        let dims = config
            .embedding
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required"))?;
        let index = Arc::new(crate::index::sqlite::SqliteIndex::new(pool, dims));
        let embedder: Arc<dyn Embedder> =
            Arc::from(crate::embedding::create_embedder(&config.embedding)?);

        Ok(Self::new(
            Arc::new(DocumentCatalog::new()),
            index,
            embedder,
            config.chunking.clone(),
            config.retrieval.clone(),
            config.embedding.batch_size,
        ))
    }

    pub fn catalog(&self) -> &DocumentCatalog {
        &self.catalog
    }

    /// Chunk, embed, and index extracted document text, then register it
    /// in the catalog.
    ///
    /// The document id is reserved up front (chunk keys embed it), but the
    /// catalog record only becomes visible once every chunk is stored. On
    /// a mid-batch failure, entries already written are deleted and the
    /// reserved id is abandoned.
    pub async fn index_document(
        &self,
        text: &str,
        filename: &str,
        file_type: &str,
    ) -> Result<DocumentRecord, EngineError> {
        let chunks = chunk_text(text, self.chunking.chunk_size, self.chunking.overlap);
        if chunks.is_empty() {
            return Err(EngineError::EmptyContent);
        }

        let doc_id = self.catalog.reserve_id();
        let chunk_keys: Vec<String> = chunks.iter().map(|c| chunk_key(doc_id, c.index)).collect();

        let mut written: Vec<String> = Vec::with_capacity(chunk_keys.len());
        for batch in chunks.chunks(self.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = match self.embedder.embed_batch(&texts).await {
                Ok(v) => v,
                Err(e) => {
                    self.rollback(doc_id, &written).await;
                    return Err(EngineError::IndexWrite(format!("embedding failed: {}", e)));
                }
            };

            let entries: Vec<IndexEntry> = batch
                .iter()
                .zip(vectors)
                .map(|(c, embedding)| IndexEntry {
                    id: chunk_key(doc_id, c.index),
                    embedding,
                    text: c.text.clone(),
                    meta: ChunkMeta {
                        doc_id,
                        chunk_index: c.index,
                        filename: filename.to_string(),
                    },
                })
                .collect();

            let batch_keys: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
            if let Err(e) = self.index.add(entries).await {
                self.rollback(doc_id, &written).await;
                return Err(EngineError::IndexWrite(e.to_string()));
            }
            written.extend(batch_keys);
        }

        let record = self.catalog.register(
            doc_id,
            NewDocument {
                filename: filename.to_string(),
                file_type: file_type.to_string(),
                word_count: text.split_whitespace().count(),
                char_count: text.chars().count(),
                preview: text.chars().take(PREVIEW_CHARS).collect(),
                chunk_keys,
            },
        );

        info!(
            doc_id,
            filename,
            chunks = record.chunk_count,
            "indexed document"
        );
        Ok(record)
    }

    /// Remove a document and all its index entries.
    ///
    /// Index entries are deleted before the catalog record: if the index
    /// delete fails, the record (and its authoritative chunk-key list)
    /// stays in place so the deletion can be retried without drift.
    pub async fn delete_document(&self, id: i64) -> Result<(), EngineError> {
        let record = self.catalog.get(id).ok_or(EngineError::NotFound(id))?;

        self.index
            .delete(&record.chunk_keys)
            .await
            .map_err(|e| EngineError::IndexWrite(e.to_string()))?;

        // A concurrent delete may have removed the record between our get
        // and here. The index delete above was idempotent and the entries
        // are gone either way, so this caller's delete succeeded too.
        if self.catalog.remove(id).is_err() {
            info!(doc_id = id, "record already removed by concurrent delete");
        }

        info!(doc_id = id, chunks = record.chunk_count, "deleted document");
        Ok(())
    }

    /// Top-k retrieval for a query string. Skips the embedder entirely
    /// when nothing is indexed.
    pub async fn search(
        &self,
        query: &str,
        k: Option<usize>,
    ) -> Result<Vec<RetrievalResult>, EngineError> {
        if query.trim().is_empty() {
            return Err(EngineError::Validation("query must not be empty".to_string()));
        }

        let k = k.unwrap_or(self.retrieval.top_k);
        if k == 0 {
            return Err(EngineError::Validation("top_k must be >= 1".to_string()));
        }

        retrieve(
            self.embedder.as_ref(),
            self.index.as_ref(),
            query,
            k,
            !self.catalog.is_empty(),
        )
        .await
        .map_err(|e| EngineError::IndexWrite(format!("retrieval failed: {}", e)))
    }

    /// The system prompt for one chat request: base instructions, augmented
    /// with retrieved document context when any exists.
    pub async fn system_prompt_for(&self, query: &str) -> Result<String, EngineError> {
        let results = self.search(query, None).await?;
        Ok(compose(&results).unwrap_or_else(|| BASE_SYSTEM_PROMPT.to_string()))
    }

    pub async fn health(&self) -> Result<HealthReport, EngineError> {
        let embedding_count = self
            .index
            .count()
            .await
            .map_err(|e| EngineError::IndexWrite(e.to_string()))?;
        Ok(HealthReport {
            document_count: self.catalog.len(),
            embedding_count,
        })
    }

    /// Best-effort removal of partially written entries after a failed
    /// ingest. The document was never registered, so leftover entries are
    /// the only orphan hazard.
    async fn rollback(&self, doc_id: i64, written: &[String]) {
        if written.is_empty() {
            return;
        }
        if let Err(e) = self.index.delete(written).await {
            warn!(
                doc_id,
                entries = written.len(),
                error = %e,
                "failed to roll back partial index entries"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::MemoryIndex;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic embedder: maps text length to a 2-d unit vector, and
    /// can be told to fail after N calls.
    struct TestEmbedder {
        calls: AtomicUsize,
        fail_after: Option<usize>,
    }

    impl TestEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_after: None,
            }
        }

        fn failing_after(n: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_after: Some(n),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Embedder for TestEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(limit) = self.fail_after {
                if n >= limit {
                    anyhow::bail!("embedder exploded");
                }
            }
            Ok(texts
                .iter()
                .map(|t| {
                    let angle = (t.len() % 7) as f32;
                    vec![angle.cos(), angle.sin()]
                })
                .collect())
        }

        fn dims(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "test"
        }
    }

    fn test_engine(
        embedder: TestEmbedder,
        batch_size: usize,
    ) -> (Engine, Arc<MemoryIndex>, Arc<TestEmbedder>) {
        let index = Arc::new(MemoryIndex::new(2));
        let embedder = Arc::new(embedder);
        let engine = Engine::new(
            Arc::new(DocumentCatalog::new()),
            index.clone(),
            embedder.clone(),
            ChunkingConfig {
                chunk_size: 20,
                overlap: 5,
            },
            RetrievalConfig { top_k: 3 },
            batch_size,
        );
        (engine, index, embedder)
    }

    #[tokio::test]
    async fn test_index_document_registers_and_stores_chunks() {
        let (engine, index, _embedder) = test_engine(TestEmbedder::new(), 64);
        let text = "The quick brown fox jumps over the lazy dog again and again.";
        let record = engine
            .index_document(text, "fox.txt", "txt")
            .await
            .unwrap();

        assert_eq!(record.id, 1);
        assert_eq!(record.chunk_count as i64, index.count().await.unwrap());
        assert_eq!(record.word_count, 12);
        assert!(record.preview.starts_with("The quick"));
        assert_eq!(engine.catalog().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_without_side_effects() {
        let (engine, index, _embedder) = test_engine(TestEmbedder::new(), 64);
        let err = engine.index_document("   ", "blank.txt", "txt").await;
        assert!(matches!(err, Err(EngineError::EmptyContent)));
        assert_eq!(index.count().await.unwrap(), 0);
        assert!(engine.catalog().is_empty());
    }

    #[tokio::test]
    async fn test_failed_embedding_rolls_back_partial_entries() {
        // batch_size 1 forces one embed call per chunk; fail on the second.
        let (engine, index, _embedder) = test_engine(TestEmbedder::failing_after(1), 1);
        let text = "aaaaaaaaaaaaaaaaaaaa bbbbbbbbbbbbbbbbbbbb cccccccccccccccccccc";
        let err = engine.index_document(text, "big.txt", "txt").await;

        assert!(matches!(err, Err(EngineError::IndexWrite(_))));
        assert_eq!(index.count().await.unwrap(), 0, "partial entries removed");
        assert!(engine.catalog().is_empty(), "document not registered");
    }

    #[tokio::test]
    async fn test_delete_document_removes_all_index_entries() {
        let (engine, index, _embedder) = test_engine(TestEmbedder::new(), 64);
        let before = index.count().await.unwrap();
        let record = engine
            .index_document(
                "one two three four five six seven eight nine ten eleven twelve",
                "list.txt",
                "txt",
            )
            .await
            .unwrap();
        assert!(record.chunk_count >= 3);

        engine.delete_document(record.id).await.unwrap();
        assert_eq!(index.count().await.unwrap(), before);

        // No hit may reference the deleted document.
        let hits = index.query(&[1.0, 0.0], 10).await.unwrap();
        assert!(hits.iter().all(|h| h.meta.doc_id != record.id));
    }

    /// Index wrapper that removes a catalog record while the index delete
    /// is in flight, standing in for a concurrent `delete_document` call.
    struct InterleavingIndex {
        inner: MemoryIndex,
        catalog: Arc<DocumentCatalog>,
        remove_during_delete: std::sync::atomic::AtomicI64,
    }

    #[async_trait]
    impl crate::index::VectorIndex for InterleavingIndex {
        async fn add(&self, entries: Vec<crate::index::IndexEntry>) -> Result<()> {
            self.inner.add(entries).await
        }

        async fn delete(&self, ids: &[String]) -> Result<()> {
            let id = self.remove_during_delete.load(Ordering::SeqCst);
            if id != 0 {
                let _ = self.catalog.remove(id);
            }
            self.inner.delete(ids).await
        }

        async fn query(
            &self,
            embedding: &[f32],
            k: usize,
        ) -> Result<Vec<crate::index::QueryHit>> {
            self.inner.query(embedding, k).await
        }

        async fn count(&self) -> Result<i64> {
            self.inner.count().await
        }
    }

    #[tokio::test]
    async fn test_delete_succeeds_when_record_removed_mid_delete() {
        let catalog = Arc::new(DocumentCatalog::new());
        let index = Arc::new(InterleavingIndex {
            inner: MemoryIndex::new(2),
            catalog: catalog.clone(),
            remove_during_delete: std::sync::atomic::AtomicI64::new(0),
        });
        let engine = Engine::new(
            catalog,
            index.clone(),
            Arc::new(TestEmbedder::new()),
            ChunkingConfig {
                chunk_size: 20,
                overlap: 5,
            },
            RetrievalConfig { top_k: 3 },
            64,
        );

        let record = engine
            .index_document("some document text worth indexing", "doc.txt", "txt")
            .await
            .unwrap();
        index
            .remove_during_delete
            .store(record.id, Ordering::SeqCst);

        engine.delete_document(record.id).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
        assert!(engine.catalog().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_document_is_not_found() {
        let (engine, _index, _embedder) = test_engine(TestEmbedder::new(), 64);
        assert!(matches!(
            engine.delete_document(42).await,
            Err(EngineError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_search_empty_catalog_skips_embedder() {
        let (engine, _index, embedder) = test_engine(TestEmbedder::new(), 64);
        let results = engine.search("anything", None).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(embedder.call_count(), 0, "embedder must not be invoked");

        let health = engine.health().await.unwrap();
        assert_eq!(health.document_count, 0);
        assert_eq!(health.embedding_count, 0);
    }

    #[tokio::test]
    async fn test_search_rejects_blank_query() {
        let (engine, _index, _embedder) = test_engine(TestEmbedder::new(), 64);
        assert!(matches!(
            engine.search("   ", None).await,
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_search_returns_ordered_results() {
        let (engine, _index, _embedder) = test_engine(TestEmbedder::new(), 64);
        engine
            .index_document(
                "alpha beta gamma delta epsilon zeta eta theta iota kappa",
                "greek.txt",
                "txt",
            )
            .await
            .unwrap();

        let results = engine.search("alpha", Some(2)).await.unwrap();
        assert!(results.len() <= 2);
        for pair in results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[tokio::test]
    async fn test_system_prompt_falls_back_without_documents() {
        let (engine, _index, _embedder) = test_engine(TestEmbedder::new(), 64);
        let prompt = engine.system_prompt_for("question").await.unwrap();
        assert_eq!(prompt, BASE_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_system_prompt_includes_context_when_indexed() {
        let (engine, _index, _embedder) = test_engine(TestEmbedder::new(), 64);
        engine
            .index_document(
                "rust ownership rules prevent data races at compile time",
                "rust.md",
                "md",
            )
            .await
            .unwrap();

        let prompt = engine.system_prompt_for("ownership").await.unwrap();
        assert!(prompt.contains("rust.md"));
        assert!(prompt.contains("DOCUMENT CONTEXT"));
    }
}
