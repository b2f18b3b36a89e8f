//! In-memory [`VectorIndex`] implementation for tests.
//!
//! `HashMap` behind `std::sync::RwLock`; queries are brute-force cosine
//! distance over all stored vectors, matching the SQLite backend's
//! semantics exactly.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::models::ChunkMeta;

use super::{check_dims, IndexEntry, QueryHit, VectorIndex};

struct StoredEntry {
    embedding: Vec<f32>,
    text: String,
    meta: ChunkMeta,
}

/// In-memory index keyed by composite chunk key.
pub struct MemoryIndex {
    dims: usize,
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn add(&self, entries: Vec<IndexEntry>) -> Result<()> {
        for e in &entries {
            check_dims(self.dims, e.embedding.len(), "entry embedding")?;
        }
        let mut map = self.entries.write().unwrap();
        for e in entries {
            map.insert(
                e.id,
                StoredEntry {
                    embedding: e.embedding,
                    text: e.text,
                    meta: e.meta,
                },
            );
        }
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut map = self.entries.write().unwrap();
        for id in ids {
            map.remove(id);
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        check_dims(self.dims, embedding.len(), "query embedding")?;

        let map = self.entries.read().unwrap();
        let mut hits: Vec<QueryHit> = map
            .iter()
            .map(|(id, e)| QueryHit {
                id: id.clone(),
                text: e.text.clone(),
                meta: e.meta.clone(),
                distance: cosine_distance(embedding, &e.embedding),
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
        Ok(self.entries.read().unwrap().len() as i64)
    }
}
