#[cfg(test)]
mod tests;

use thiserror::Error;
use tracing::debug;

/// A contiguous word-range slice of a source text, the unit of storage
/// and retrieval. Offsets are word indices into the original text so the
/// chunk keeps its provenance independently of how it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Index of this chunk within its source text
    pub chunk_id: i32,
    /// Index of the first word covered by this chunk
    pub start_word: i32,
    /// One past the index of the last word covered by this chunk
    pub end_word: i32,
    /// The chunk text, words rejoined with single spaces
    pub text: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("Overlap {overlap} must be smaller than chunk size {chunk_size}")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
}

/// Split text into overlapping fixed-size word windows.
///
/// Chunk `i` spans words `[i*(C-O), min(i*(C-O)+C, N))` where `C` is
/// `chunk_size`, `O` is `overlap` and `N` is the word count. The final
/// chunk may be shorter than `C`. Adjacent chunks share exactly `O`
/// words, except possibly across the shorter final chunk.
///
/// `overlap >= chunk_size` would never terminate and is rejected before
/// any chunking is attempted.
#[inline]
pub fn chunk_words(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<TextChunk>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::ZeroChunkSize);
    }
    if overlap >= chunk_size {
        return Err(ChunkError::OverlapTooLarge {
            chunk_size,
            overlap,
        });
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let stride = chunk_size - overlap;
    let mut chunks = Vec::new();

    let mut i = 0usize;
    while i * stride < words.len() {
        let start = i * stride;
        let end = (start + chunk_size).min(words.len());
        chunks.push(TextChunk {
            chunk_id: i32::try_from(i).unwrap_or(i32::MAX),
            start_word: i32::try_from(start).unwrap_or(i32::MAX),
            end_word: i32::try_from(end).unwrap_or(i32::MAX),
            text: words[start..end].join(" "),
        });
        i += 1;
    }

    debug!(
        "Chunked {} words into {} chunks (size {}, overlap {})",
        words.len(),
        chunks.len(),
        chunk_size,
        overlap
    );

    Ok(chunks)
}
