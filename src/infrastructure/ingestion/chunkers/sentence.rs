//! Sentence-based chunking strategy

use unicode_segmentation::UnicodeSegmentation;

use crate::domain::DomainError;
use crate::domain::ingestion::{
    Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy, chunker::helpers,
};

/// Packs whole sentences into chunks of at most `chunk_size` characters.
///
/// Consecutive chunks share up to `chunk_overlap` trailing characters of the
/// previous chunk. Sentences longer than a chunk are hard-split.
#[derive(Debug, Clone, Default)]
pub struct SentenceChunker;

/// A trimmed sentence (or piece of one) and its character offset in the source
#[derive(Debug)]
struct Piece<'a> {
    start: usize,
    text: &'a str,
}

impl SentenceChunker {
    /// Create a new sentence chunker
    pub fn new() -> Self {
        Self
    }

    fn split_pieces<'a>(content: &'a str, max_chars: usize) -> Vec<Piece<'a>> {
        let mut pieces = Vec::new();

        for (byte_idx, segment) in content.split_sentence_bound_indices() {
            let text = segment.trim();
            if text.is_empty() {
                continue;
            }
            let leading = segment.len() - segment.trim_start().len();
            let start = content[..byte_idx + leading].chars().count();

            if text.chars().count() <= max_chars {
                pieces.push(Piece { start, text });
                continue;
            }

            let mut offset = 0;
            let mut piece_start = 0;
            for (count, (idx, _)) in text.char_indices().enumerate() {
                if count > 0 && count % max_chars == 0 {
                    pieces.push(Piece {
                        start: start + offset,
                        text: &text[piece_start..idx],
                    });
                    piece_start = idx;
                    offset = count;
                }
            }
            pieces.push(Piece {
                start: start + offset,
                text: &text[piece_start..],
            });
        }

        pieces
    }

    fn push_chunk(
        chunks: &mut Vec<Chunk>,
        source_id: &str,
        content: &str,
        start: usize,
        end: usize,
        config: &ChunkingConfig,
    ) {
        let trimmed = content.trim();
        if trimmed.chars().count() >= config.min_chunk_size && !trimmed.is_empty() {
            chunks.push(Chunk::new(
                source_id,
                trimmed,
                ChunkMetadata::new(chunks.len(), 0, start, end),
            ));
        }
    }
}

impl ChunkingStrategy for SentenceChunker {
    fn chunk(
        &self,
        source_id: &str,
        content: &str,
        config: &ChunkingConfig,
    ) -> Result<Vec<Chunk>, DomainError> {
        config.validate()?;

        let pieces = Self::split_pieces(content, config.chunk_size);
        if pieces.is_empty() {
            return Ok(vec![]);
        }

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;
        let mut chunk_start = 0;
        let mut chunk_end = 0;

        for piece in pieces {
            let piece_len = piece.text.chars().count();

            if current.is_empty() {
                current.push_str(piece.text);
                current_len = piece_len;
                chunk_start = piece.start;
            } else if current_len + 1 + piece_len <= config.chunk_size {
                current.push(' ');
                current.push_str(piece.text);
                current_len += 1 + piece_len;
            } else {
                Self::push_chunk(&mut chunks, source_id, &current, chunk_start, chunk_end, config);

                let room = config.chunk_size.saturating_sub(piece_len + 1);
                let tail = helpers::char_tail(&current, config.chunk_overlap.min(room)).trim_start();

                if tail.is_empty() {
                    current = piece.text.to_string();
                    current_len = piece_len;
                    chunk_start = piece.start;
                } else {
                    let tail_len = tail.chars().count();
                    current = format!("{tail} {}", piece.text);
                    current_len = tail_len + 1 + piece_len;
                    chunk_start = chunk_end.saturating_sub(tail_len);
                }
            }

            chunk_end = piece.start + piece_len;
        }

        Self::push_chunk(&mut chunks, source_id, &current, chunk_start, chunk_end, config);

        helpers::finalize(&mut chunks);
        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "sentence"
    }
}
