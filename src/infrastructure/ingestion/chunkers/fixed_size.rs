//! Fixed-size chunking strategy

use crate::domain::DomainError;
use crate::domain::ingestion::{
    Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy, chunker::helpers,
};

/// Splits text into overlapping windows of `chunk_size` characters.
///
/// Window starts advance by `chunk_size - chunk_overlap`. Each window is
/// trimmed, and windows whose trimmed length is below `min_chunk_size` are
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct FixedSizeChunker;

impl FixedSizeChunker {
    /// Create a new fixed-size chunker
    pub fn new() -> Self {
        Self
    }
}

impl ChunkingStrategy for FixedSizeChunker {
    fn chunk(
        &self,
        source_id: &str,
        content: &str,
        config: &ChunkingConfig,
    ) -> Result<Vec<Chunk>, DomainError> {
        config.validate()?;

        let chars: Vec<char> = content.chars().collect();
        if chars.iter().all(|c| c.is_whitespace()) {
            return Ok(vec![]);
        }

        let mut chunks = Vec::new();
        let step = config.step();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + config.chunk_size).min(chars.len());
            let window: String = chars[start..end].iter().collect();
            let (leading, trailing) = helpers::whitespace_margins(&window);
            let trimmed = window.trim();

            if !trimmed.is_empty() && trimmed.chars().count() >= config.min_chunk_size {
                chunks.push(Chunk::new(
                    source_id,
                    trimmed,
                    ChunkMetadata::new(chunks.len(), 0, start + leading, end - trailing),
                ));
            }

            if end >= chars.len() {
                break;
            }

            start += step;
        }

        helpers::finalize(&mut chunks);
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "fixed_size"
    }
}
