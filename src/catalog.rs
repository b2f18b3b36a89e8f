//! In-memory document registry.
//!
//! Owns document metadata and the monotonic id counter. A single mutex
//! serializes id assignment and registration so concurrent uploads can
//! never observe duplicate ids or a half-registered record. The catalog
//! itself is not persisted; only the vector index is durable.
//!
//! Ingest is two-phase: [`DocumentCatalog::reserve_id`] hands out the id
//! (chunk keys embed it), the index is written, and only then does
//! [`DocumentCatalog::register`] make the record visible. A failed index
//! write burns the reserved id — ids are never reused.

use std::sync::Mutex;

use chrono::Utc;

use crate::error::EngineError;
use crate::models::DocumentRecord;

/// Everything needed to register a document, minus the fields the catalog
/// assigns itself (id, timestamp).
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub file_type: String,
    pub word_count: usize,
    pub char_count: usize,
    pub preview: String,
    /// Explicit chunk-key list; deletion hands this set to the vector
    /// index rather than recomputing keys from a count.
    pub chunk_keys: Vec<String>,
}

struct CatalogInner {
    next_id: i64,
    // Insertion order doubles as listing order.
    docs: Vec<DocumentRecord>,
}

/// Registry of indexed documents, shared across request handlers.
pub struct DocumentCatalog {
    inner: Mutex<CatalogInner>,
}

impl DocumentCatalog {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CatalogInner {
                next_id: 1,
                docs: Vec::new(),
            }),
        }
    }

    /// Claim the next document id. The counter never moves backwards, so
    /// ids stay unique for the process lifetime even when an ingest fails
    /// after reservation.
    pub fn reserve_id(&self) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        id
    }

    /// Record a fully indexed document under a previously reserved id.
    pub fn register(&self, id: i64, doc: NewDocument) -> DocumentRecord {
        let record = DocumentRecord {
            id,
            filename: doc.filename,
            uploaded_at: Utc::now(),
            file_type: doc.file_type,
            word_count: doc.word_count,
            char_count: doc.char_count,
            chunk_count: doc.chunk_keys.len(),
            preview: doc.preview,
            chunk_keys: doc.chunk_keys,
        };
        self.inner.lock().unwrap().docs.push(record.clone());
        record
    }

    /// All registered documents, in insertion order.
    pub fn list(&self) -> Vec<DocumentRecord> {
        self.inner.lock().unwrap().docs.clone()
    }

    pub fn get(&self, id: i64) -> Option<DocumentRecord> {
        self.inner
            .lock()
            .unwrap()
            .docs
            .iter()
            .find(|d| d.id == id)
            .cloned()
    }

    /// Remove a document, returning its record so the caller can cascade
    /// the deletion to the vector index.
    pub fn remove(&self, id: i64) -> Result<DocumentRecord, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let pos = inner
            .docs
            .iter()
            .position(|d| d.id == id)
            .ok_or(EngineError::NotFound(id))?;
        Ok(inner.docs.remove(pos))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().docs.is_empty()
    }
}

impl Default for DocumentCatalog {
    fn default() -> Self {
        Self::new()
    }
}
