//! Sliding-window text chunker.
//!
//! Splits document text into fixed-size windows that overlap by a
//! configurable amount, so that sentences straddling a window boundary are
//! fully contained in at least one chunk. Offsets are character offsets
//! into the original text and are preserved even when whitespace-only
//! windows are dropped.

use crate::models::Chunk;

/// Split `text` into overlapping chunks of at most `chunk_size` characters.
///
/// The cursor advances by `chunk_size - overlap` per step, so consecutive
/// chunks share `overlap` characters (the final chunk may be shorter).
/// Windows containing only whitespace are dropped without renumbering the
/// offsets of later chunks; chunk indices are assigned in emission order
/// starting at 0.
///
/// Empty input yields an empty vector; callers must treat that as
/// "document produced no indexable content", not success.
///
/// Precondition: `chunk_size > 0` and `overlap < chunk_size`. Violating it
/// would make the loop non-terminating, so it is asserted here and rejected
/// at config-load time.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    assert!(chunk_size > 0, "chunk_size must be > 0");
    assert!(overlap < chunk_size, "overlap must be < chunk_size");

    let chars: Vec<char> = text.chars().collect();
    let stride = chunk_size - overlap;

    let mut chunks = Vec::new();
    let mut index: i64 = 0;
    let mut start = 0usize;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();

        if !window.trim().is_empty() {
            chunks.push(Chunk {
                index,
                text: window,
                start,
                end,
            });
            index += 1;
        }

        start += stride;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 100, 20).is_empty());
    }

    #[test]
    fn test_whitespace_only_yields_no_chunks() {
        assert!(chunk_text("   \n\t  ", 4, 1).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("hello", 100, 20);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "hello");
        assert_eq!((chunks[0].start, chunks[0].end), (0, 5));
    }

    #[test]
    fn test_overlap_windows() {
        // chunk_size=4, overlap=1 => stride 3
        let chunks = chunk_text("abcdefghij", 4, 1);
        let got: Vec<(usize, usize, &str)> = chunks
            .iter()
            .map(|c| (c.start, c.end, c.text.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![(0, 4, "abcd"), (3, 7, "defg"), (6, 10, "ghij"), (9, 10, "j")]
        );
    }

    #[test]
    fn test_offsets_reconstruct_source() {
        let text = "The quick brown fox jumps over the lazy dog. \
                    Pack my box with five dozen liquor jugs.";
        let chars: Vec<char> = text.chars().collect();
        for c in chunk_text(text, 17, 5) {
            assert!(c.start < c.end);
            assert!(c.end <= chars.len());
            let slice: String = chars[c.start..c.end].iter().collect();
            assert_eq!(slice, c.text);
        }
    }

    #[test]
    fn test_dropped_windows_keep_source_offsets() {
        // The middle window is pure whitespace and must not occupy an index,
        // but the following chunk still carries its original offsets.
        let text = "ab      cd";
        let chunks = chunk_text(text, 3, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "ab ");
        assert_eq!(chunks[1].index, 1);
        assert_eq!((chunks[1].start, chunks[1].end), (6, 9));
        assert_eq!(chunks[2].index, 2);
        assert_eq!((chunks[2].start, chunks[2].end), (9, 10));
    }

    #[test]
    fn test_multibyte_text_uses_char_offsets() {
        let text = "héllo wörld";
        let chars: Vec<char> = text.chars().collect();
        for c in chunk_text(text, 4, 1) {
            let slice: String = chars[c.start..c.end].iter().collect();
            assert_eq!(slice, c.text);
        }
    }

    #[test]
    fn test_zero_overlap_partitions_text() {
        let chunks = chunk_text("abcdefgh", 3, 0);
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, "abcdefgh");
    }

    #[test]
    #[should_panic(expected = "overlap must be < chunk_size")]
    fn test_overlap_at_least_chunk_size_panics() {
        chunk_text("abc", 4, 4);
    }
}
