//! Error taxonomy for the document pipeline.
//!
//! All core failures are returned as values; the transport layer maps them
//! to HTTP statuses. Validation and not-found errors are user-correctable
//! (4xx); extraction and index-write failures are server-side (5xx) and
//! must leave the catalog and index untouched.

/// Errors produced by the engine's document and search operations.
#[derive(Debug)]
pub enum EngineError {
    /// Rejected before any side effect: empty query, disallowed file type,
    /// oversized upload.
    Validation(String),
    /// The text extractor could not produce content from the uploaded bytes.
    Extraction(String),
    /// Chunking the extracted text yielded zero chunks.
    EmptyContent,
    /// Embedding or vector-store write failed. Any partial entries for the
    /// document have been rolled back and the document is not registered.
    IndexWrite(String),
    /// Lookup or deletion of an unknown document id.
    NotFound(i64),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "validation failed: {}", msg),
            EngineError::Extraction(msg) => write!(f, "text extraction failed: {}", msg),
            EngineError::EmptyContent => {
                write!(f, "document produced no indexable content")
            }
            EngineError::IndexWrite(msg) => write!(f, "index write failed: {}", msg),
            EngineError::NotFound(id) => write!(f, "document {} not found", id),
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            EngineError::NotFound(4).to_string(),
            "document 4 not found"
        );
        assert!(EngineError::EmptyContent.to_string().contains("no indexable"));
    }
}
