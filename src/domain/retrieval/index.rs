//! In-memory inner-product index over normalized chunk embeddings

use thiserror::Error;
use tracing::{debug, info};

use super::{ReferenceDocument, SearchHit, preprocess_text};
use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest, normalize};
use crate::domain::ingestion::{Chunk, ChunkingConfig, ChunkingStrategy};

/// Reasons an index could not be built
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    #[error("No usable chunks in {documents} reference document(s)")]
    NoUsableChunks { documents: usize },

    #[error("Chunking failed for document '{document}': {message}")]
    Chunking { document: String, message: String },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Inconsistent embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Flat vector index. Vectors are L2-normalized on insert so inner product
/// equals cosine similarity.
#[derive(Debug, Clone)]
pub struct ContextIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

impl ContextIndex {
    /// Chunk every document, embed all chunks in one call and index them
    pub async fn build(
        documents: &[ReferenceDocument],
        chunker: &dyn ChunkingStrategy,
        config: &ChunkingConfig,
        embedder: &dyn EmbeddingProvider,
        model: &str,
    ) -> Result<Self, IndexError> {
        let mut chunks = Vec::new();
        for document in documents.iter().filter(|d| !d.is_blank()) {
            let text = preprocess_text(&document.content);
            let document_chunks =
                chunker
                    .chunk(&document.id, &text, config)
                    .map_err(|e| IndexError::Chunking {
                        document: document.id.clone(),
                        message: e.to_string(),
                    })?;
            debug!(
                document = %document.id,
                chunks = document_chunks.len(),
                chunker = chunker.name(),
                "Chunked reference document"
            );
            chunks.extend(document_chunks);
        }

        if chunks.is_empty() {
            return Err(IndexError::NoUsableChunks {
                documents: documents.len(),
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let response = embedder
            .embed(EmbeddingRequest::batch(model, texts))
            .await
            .map_err(|e| IndexError::Embedding(format!("{}: {e}", embedder.provider_name())))?;
        let vectors = response.into_vectors();

        let index = Self::from_parts(chunks, vectors)?;
        info!(
            chunks = index.len(),
            dimension = index.dimension,
            documents = documents.len(),
            provider = embedder.provider_name(),
            "Built reference index"
        );
        Ok(index)
    }

    /// Index pre-computed vectors; one vector per chunk, all the same length
    pub fn from_parts(chunks: Vec<Chunk>, mut vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        if vectors.len() != chunks.len() {
            return Err(IndexError::CountMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }

        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        for vector in vectors.iter_mut() {
            normalize(vector);
        }

        Ok(Self {
            chunks,
            vectors,
            dimension,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Top `k` chunks by descending similarity to `query`
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, v.iter().zip(&query).map(|(a, b)| a * b).sum()))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchHit {
                chunk: self.chunks[i].clone(),
                score,
            })
            .collect())
    }
}
