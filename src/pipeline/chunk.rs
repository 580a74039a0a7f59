//! Text chunking: fixed-width slices for a length-bounded translation backend.
//!
//! Chunking is deliberately dumb: chunk *i* covers the next `max_chars`
//! characters, with no attempt to avoid splitting mid-word, mid-sentence, or
//! mid-formula. Chunks are translated independently with no cross-chunk
//! context, so smarter boundaries would not remove the boundary-quality
//! limitation — they would only hide it.
//!
//! The one law this module must uphold: concatenating all chunks in order
//! reproduces the input byte for byte.

use serde::{Deserialize, Serialize};

/// One contiguous slice of the full extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Byte offset of this chunk's first byte in the original text.
    pub start: usize,
    /// The chunk content, exactly as it appears in the original.
    pub text: String,
}

/// Split `text` into ordered, non-overlapping chunks of at most `max_chars`
/// characters each.
///
/// Slicing counts characters, not bytes, so a chunk boundary can never land
/// inside a multi-byte sequence. Empty input yields an empty Vec.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<TextChunk> {
    debug_assert!(max_chars > 0);
    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut chars_in_chunk = 0usize;

    for (offset, _) in text.char_indices() {
        if chars_in_chunk == max_chars {
            chunks.push(TextChunk {
                start,
                text: text[start..offset].to_string(),
            });
            start = offset;
            chars_in_chunk = 0;
        }
        chars_in_chunk += 1;
    }

    if start < text.len() {
        chunks.push(TextChunk {
            start,
            text: text[start..].to_string(),
        });
    }

    chunks
}
