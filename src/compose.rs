//! Context assembly: retrieval results → system-prompt augmentation.
//!
//! Turns ranked chunks into a bounded, source-attributed context block
//! wrapped in fixed instructional framing. The composed string replaces the
//! assistant's base instructions for a single request only; nothing here is
//! shared or persisted.

use crate::models::RetrievalResult;

/// Base instructions used when no document context is available.
pub const BASE_SYSTEM_PROMPT: &str = "You are a helpful research assistant. Help users with \
their research questions, summarize information, explain concepts clearly, and assist with \
learning. Be concise but thorough.";

/// Build the system-prompt augmentation from retrieval results.
///
/// Returns `None` for empty input: the caller must fall back to
/// [`BASE_SYSTEM_PROMPT`] rather than fabricating a misleading "no relevant
/// documents" context block.
pub fn compose(results: &[RetrievalResult]) -> Option<String> {
    if results.is_empty() {
        return None;
    }

    let blocks: Vec<String> = results
        .iter()
        .map(|r| format!("[Source: {}]\n{}", r.meta.filename, r.text))
        .collect();

    Some(format!(
        "{base}\n\n\
         You have access to the following excerpts from the user's uploaded documents. \
         Prefer this context when answering, and cite the source filename when you use it. \
         If the context is insufficient to answer, say so explicitly and fall back to your \
         general knowledge with a clear disclaimer.\n\n\
         --- DOCUMENT CONTEXT ---\n\
         {context}\n\
         --- END DOCUMENT CONTEXT ---",
        base = BASE_SYSTEM_PROMPT,
        context = blocks.join("\n\n"),
    ))
}
