//! Context retriever - Lazily indexes reference documents and answers top-k queries

use std::sync::Arc;

use tracing::{debug, warn};

use super::{ContextIndex, IndexError, ReferenceDocument, SearchHit, preprocess_text};
use crate::domain::embedding::{EmbeddingProvider, EmbeddingRequest};
use crate::domain::ingestion::{ChunkingConfig, ChunkingStrategy};

/// Retrieval settings for one batch
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub chunking: ChunkingConfig,
    /// Characters kept from each chunk when formatting references
    pub max_reference_chars: usize,
    pub embedding_model: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            chunking: ChunkingConfig::default(),
            max_reference_chars: 300,
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }
}

#[derive(Debug)]
enum IndexState {
    Pending,
    Ready(ContextIndex),
    Unavailable(IndexError),
}

/// Top-k context lookup over a fixed set of reference documents.
///
/// The index is built on the first query and reused afterwards. A failed
/// build is remembered too, so every later query returns no context
/// without trying again.
#[derive(Debug)]
pub struct ContextRetriever {
    documents: Vec<ReferenceDocument>,
    chunker: Arc<dyn ChunkingStrategy>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
    state: IndexState,
}

impl ContextRetriever {
    pub fn new(
        documents: Vec<ReferenceDocument>,
        chunker: Arc<dyn ChunkingStrategy>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            documents,
            chunker,
            embedder,
            config,
            state: IndexState::Pending,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn has_documents(&self) -> bool {
        self.documents.iter().any(|d| !d.is_blank())
    }

    /// Number of indexed chunks, `None` until a build has succeeded
    pub fn indexed_chunks(&self) -> Option<usize> {
        match &self.state {
            IndexState::Ready(index) => Some(index.len()),
            _ => None,
        }
    }

    /// The memoized build failure, if the index could not be built
    pub fn build_error(&self) -> Option<&IndexError> {
        match &self.state {
            IndexState::Unavailable(error) => Some(error),
            _ => None,
        }
    }

    /// Top `config.top_k` chunks for `query`
    pub async fn retrieve(&mut self, query: &str) -> Vec<SearchHit> {
        let k = self.config.top_k;
        self.retrieve_k(query, k).await
    }

    /// At most `min(k, indexed chunks)` hits by descending similarity.
    /// Any failure yields an empty list.
    pub async fn retrieve_k(&mut self, query: &str, k: usize) -> Vec<SearchHit> {
        let query = preprocess_text(query);
        if query.is_empty() || k == 0 || !self.has_documents() {
            return Vec::new();
        }

        self.ensure_index().await;
        let index = match &self.state {
            IndexState::Ready(index) => index,
            _ => return Vec::new(),
        };

        let request = EmbeddingRequest::single(&self.config.embedding_model, query);
        let vector = match self.embedder.embed(request).await {
            Ok(response) => match response.into_vectors().into_iter().next() {
                Some(vector) => vector,
                None => {
                    warn!("Embedding provider returned no vector for query");
                    return Vec::new();
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to embed retrieval query; grading without context");
                return Vec::new();
            }
        };

        match index.search(&vector, k) {
            Ok(hits) => {
                debug!(hits = hits.len(), k, "Retrieved reference context");
                hits
            }
            Err(e) => {
                warn!(error = %e, "Reference search failed; grading without context");
                Vec::new()
            }
        }
    }

    async fn ensure_index(&mut self) {
        if !matches!(self.state, IndexState::Pending) {
            return;
        }

        self.state = match ContextIndex::build(
            &self.documents,
            self.chunker.as_ref(),
            &self.config.chunking,
            self.embedder.as_ref(),
            &self.config.embedding_model,
        )
        .await
        {
            Ok(index) => IndexState::Ready(index),
            Err(e) => {
                warn!(error = %e, "Reference index unavailable; grading without context");
                IndexState::Unavailable(e)
            }
        };
    }

    /// Format hits as a numbered reference block using the configured budget
    pub fn format(&self, hits: &[SearchHit]) -> String {
        format_references(hits, self.config.max_reference_chars)
    }
}

/// Numbered reference block, each chunk truncated to `max_chars` characters
/// with `...` appended when cut
pub fn format_references(hits: &[SearchHit], max_chars: usize) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let content = hit.chunk.content.trim();
            let body = if content.chars().count() > max_chars {
                let cut: String = content.chars().take(max_chars).collect();
                format!("{cut}...")
            } else {
                content.to_string()
            };
            format!("Reference {}:\n{}", i + 1, body)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::ingestion::{Chunk, ChunkMetadata, MockChunkingStrategy};

    fn retriever(
        documents: Vec<ReferenceDocument>,
        embedder: Arc<MockEmbeddingProvider>,
    ) -> ContextRetriever {
        ContextRetriever::new(
            documents,
            Arc::new(MockChunkingStrategy::new()),
            embedder,
            RetrievalConfig {
                top_k: 2,
                ..Default::default()
            },
        )
    }

    fn docs() -> Vec<ReferenceDocument> {
        vec![
            ReferenceDocument::new("seoul", "Seoul is the capital city of Korea."),
            ReferenceDocument::new("jeju", "Jeju island has volcanic landscapes."),
            ReferenceDocument::new("busan", "Busan is a large port city."),
        ]
    }

    fn hit(text: &str) -> SearchHit {
        SearchHit {
            chunk: Chunk::new("doc", text, ChunkMetadata::new(0, 1, 0, text.len())),
            score: 1.0,
        }
    }

    #[tokio::test]
    async fn test_retrieve_ranks_relevant_chunk_first() {
        let embedder = Arc::new(MockEmbeddingProvider::new(256));
        let mut retriever = retriever(docs(), embedder.clone());

        let hits = retriever.retrieve("What is the capital of Korea?").await;

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.source_id, "seoul");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_index_built_once() {
        let embedder = Arc::new(MockEmbeddingProvider::new(64));
        let mut retriever = retriever(docs(), embedder.clone());

        retriever.retrieve("capital").await;
        retriever.retrieve("island").await;

        // One batched index build plus one call per query
        assert_eq!(embedder.batch_sizes(), vec![3, 1, 1]);
        assert_eq!(retriever.indexed_chunks(), Some(3));
    }

    #[tokio::test]
    async fn test_k_larger_than_index() {
        let embedder = Arc::new(MockEmbeddingProvider::new(64));
        let mut retriever = retriever(docs(), embedder);

        assert_eq!(retriever.retrieve_k("city", 10).await.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_query_or_documents() {
        let embedder = Arc::new(MockEmbeddingProvider::new(64));
        let mut with_docs = retriever(docs(), embedder.clone());
        assert!(with_docs.retrieve("   ").await.is_empty());

        let mut without_docs = retriever(vec![], embedder.clone());
        assert!(without_docs.retrieve("capital").await.is_empty());
        assert_eq!(embedder.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_build_is_memoized() {
        let embedder = Arc::new(MockEmbeddingProvider::new(64).with_error("down"));
        let mut retriever = retriever(docs(), embedder.clone());

        assert!(retriever.retrieve("capital").await.is_empty());
        assert!(retriever.retrieve("island").await.is_empty());

        assert_eq!(embedder.call_count(), 1);
        assert!(matches!(
            retriever.build_error(),
            Some(IndexError::Embedding(_))
        ));
    }

    #[test]
    fn test_format_references_numbers_and_truncates() {
        let long = "a".repeat(350);
        let block = format_references(&[hit("Seoul is the capital."), hit(&long)], 300);

        let expected_tail = format!("Reference 2:\n{}...", "a".repeat(300));
        assert!(block.starts_with("Reference 1:\nSeoul is the capital.\n\n"));
        assert!(block.ends_with(&expected_tail));
    }

    #[test]
    fn test_format_references_empty() {
        assert_eq!(format_references(&[], 300), "");
    }
}
