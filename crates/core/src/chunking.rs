use crate::error::{RagError, Result};
use crate::models::Chunk;
use sha2::{Digest, Sha256};

/// Window sizes for [`split_into_chunks`].
///
/// Both sizes count whitespace-separated words, not model tokens. An
/// embedding model with a token limit may still truncate a long chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            overlap_size: 20,
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap_size: usize) -> Result<Self> {
        let config = Self {
            chunk_size,
            overlap_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Validation(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.overlap_size >= self.chunk_size {
            return Err(RagError::Validation(format!(
                "overlap size {} must be smaller than chunk size {}",
                self.overlap_size, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Words the window advances between consecutive chunks.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap_size
    }
}

/// Splits `text` on whitespace and emits overlapping windows of words.
///
/// The final chunk is the first window that reaches the end of the text, so
/// it may be shorter than `chunk_size`. Empty input yields no chunks.
pub fn split_into_chunks(text: &str, config: ChunkingConfig) -> Result<Vec<Chunk>> {
    config.validate()?;

    let words = text.split_whitespace().collect::<Vec<_>>();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < words.len() {
        let end = (start + config.chunk_size).min(words.len());
        chunks.push(Chunk {
            text: words[start..end].join(" "),
            ordinal: chunks.len(),
        });
        if end == words.len() {
            break;
        }
        start += config.step();
    }

    Ok(chunks)
}

/// Deterministic id for a chunk of a given source.
pub fn content_chunk_id(source_id: &str, chunk: &Chunk) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update([0u8]);
    hasher.update((chunk.ordinal as u64).to_le_bytes());
    hasher.update(chunk.text.as_bytes());
    format!("{:x}", hasher.finalize())
}
