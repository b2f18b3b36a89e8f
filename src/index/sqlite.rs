//! SQLite-backed [`VectorIndex`].
//!
//! Embeddings are stored as little-endian f32 BLOBs alongside the chunk
//! text and metadata. Queries fetch all vectors and compute cosine distance
//! in Rust; at the corpus sizes a single assistant serves, a brute-force
//! scan outperforms maintaining an ANN structure.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use crate::models::ChunkMeta;

use super::{check_dims, IndexEntry, QueryHit, VectorIndex};

pub struct SqliteIndex {
    pool: SqlitePool,
    dims: usize,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool, dims: usize) -> Self {
        Self { pool, dims }
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn add(&self, entries: Vec<IndexEntry>) -> Result<()> {
        for e in &entries {
            check_dims(self.dims, e.embedding.len(), "entry embedding")?;
        }

        // Single transaction so a batch never partially applies.
        let mut tx = self.pool.begin().await?;
        for e in entries {
            sqlx::query(
                r#"
                INSERT INTO chunk_vectors (id, doc_id, chunk_index, filename, text, embedding)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    doc_id = excluded.doc_id,
                    chunk_index = excluded.chunk_index,
                    filename = excluded.filename,
                    text = excluded.text,
                    embedding = excluded.embedding
                "#,
            )
            .bind(&e.id)
            .bind(e.meta.doc_id)
            .bind(e.meta.chunk_index)
            .bind(&e.meta.filename)
            .bind(&e.text)
            .bind(vec_to_blob(&e.embedding))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM chunk_vectors WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        check_dims(self.dims, embedding.len(), "query embedding")?;

        let rows =
            sqlx::query("SELECT id, doc_id, chunk_index, filename, text, embedding FROM chunk_vectors")
                .fetch_all(&self.pool)
                .await?;

        let mut hits: Vec<QueryHit> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let stored = blob_to_vec(&blob);
                QueryHit {
                    id: row.get("id"),
                    text: row.get("text"),
                    meta: ChunkMeta {
                        doc_id: row.get("doc_id"),
                        chunk_index: row.get("chunk_index"),
                        filename: row.get("filename"),
                    },
                    distance: cosine_distance(embedding, &stored),
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk_vectors")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
