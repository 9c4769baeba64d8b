//! Chunking strategy trait and types

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::DomainError;

/// Which chunker `ChunkerFactory` builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingType {
    /// Fixed-size character windows
    #[default]
    FixedSize,
    /// Sentences packed up to the chunk size
    Sentence,
}

/// Window sizes shared by every chunker, all in characters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Upper bound on chunk length
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Chunks whose trimmed length falls below this are dropped
    pub min_chunk_size: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            min_chunk_size: 10,
        }
    }

    pub fn with_min_chunk_size(mut self, min_size: usize) -> Self {
        self.min_chunk_size = min_size;
        self
    }

    /// Distance between the starts of two consecutive windows
    pub fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.chunk_size == 0 {
            return Err(DomainError::validation("chunk_size must be greater than 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(DomainError::validation(
                "chunk_overlap must be less than chunk_size",
            ));
        }

        if self.min_chunk_size > self.chunk_size {
            return Err(DomainError::validation(
                "min_chunk_size must be less than or equal to chunk_size",
            ));
        }

        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            min_chunk_size: 10,
        }
    }
}

/// Position of a chunk within its source document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Index of this chunk (0-based)
    pub chunk_index: usize,
    /// Total number of chunks produced from the source
    pub total_chunks: usize,
    /// Character offset where this chunk starts
    pub char_start: usize,
    /// Character offset where this chunk ends (exclusive)
    pub char_end: usize,
}

impl ChunkMetadata {
    pub fn new(chunk_index: usize, total_chunks: usize, char_start: usize, char_end: usize) -> Self {
        Self {
            chunk_index,
            total_chunks,
            char_start,
            char_end,
        }
    }
}

/// A chunk of text extracted from a reference document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Identifier of the document this chunk came from
    pub source_id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(
        source_id: impl Into<String>,
        content: impl Into<String>,
        metadata: ChunkMetadata,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            content: content.into(),
            metadata,
        }
    }

    pub fn index(&self) -> usize {
        self.metadata.chunk_index
    }

    /// Length of the content in characters
    pub fn len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Splits one reference document into chunks tagged with its id.
///
/// Implementations are deterministic: the same input always yields the
/// same chunks.
pub trait ChunkingStrategy: Send + Sync + Debug {
    /// Split the content of `source_id` into chunks
    fn chunk(
        &self,
        source_id: &str,
        content: &str,
        config: &ChunkingConfig,
    ) -> Result<Vec<Chunk>, DomainError>;

    fn name(&self) -> &'static str;
}

/// Character-level helpers shared by the chunkers
pub mod helpers {
    use super::Chunk;

    /// Last `count` characters of `text`
    pub fn char_tail(text: &str, count: usize) -> &str {
        let total = text.chars().count();
        if count >= total {
            return text;
        }
        let skip = total - count;
        match text.char_indices().nth(skip) {
            Some((byte_idx, _)) => &text[byte_idx..],
            None => "",
        }
    }

    /// Number of leading and trailing whitespace characters
    pub fn whitespace_margins(text: &str) -> (usize, usize) {
        let leading = text.chars().take_while(|c| c.is_whitespace()).count();
        if leading == text.chars().count() {
            return (leading, 0);
        }
        let trailing = text.chars().rev().take_while(|c| c.is_whitespace()).count();
        (leading, trailing)
    }

    /// Fill in `total_chunks` once the final count is known
    pub fn finalize(chunks: &mut [Chunk]) {
        let total = chunks.len();
        for chunk in chunks.iter_mut() {
            chunk.metadata.total_chunks = total;
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Mock chunking strategy for testing
    #[derive(Debug)]
    pub struct MockChunkingStrategy {
        result: Mutex<Option<Result<Vec<Chunk>, String>>>,
    }

    impl MockChunkingStrategy {
        pub fn new() -> Self {
            Self {
                result: Mutex::new(None),
            }
        }

        pub fn with_error(self, error: impl Into<String>) -> Self {
            *self.result.lock().unwrap() = Some(Err(error.into()));
            self
        }
    }

    impl Default for MockChunkingStrategy {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ChunkingStrategy for MockChunkingStrategy {
        fn chunk(
            &self,
            source_id: &str,
            content: &str,
            config: &ChunkingConfig,
        ) -> Result<Vec<Chunk>, DomainError> {
            if let Some(result) = self.result.lock().unwrap().take() {
                return result.map_err(DomainError::validation);
            }

            config.validate()?;

            if content.trim().is_empty() {
                return Ok(vec![]);
            }

            let len = content.chars().count();
            Ok(vec![Chunk::new(
                source_id,
                content,
                ChunkMetadata::new(0, 1, 0, len),
            )])
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }
}
