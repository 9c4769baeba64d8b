//! Per-batch state: response cache and reference retriever

use std::sync::Arc;

use super::GradingConfig;
use crate::domain::cache::{CacheStats, ResponseCache, ResponseCacheConfig};
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::ingestion::ChunkingStrategy;
use crate::domain::retrieval::{ContextRetriever, ReferenceDocument, RetrievalConfig};
use crate::domain::validation::GradingResponse;

/// State owned by one batch run and dropped with it, so nothing leaks
/// between batches
#[derive(Debug)]
pub struct BatchSession {
    pub(crate) cache: ResponseCache<GradingResponse>,
    pub(crate) retriever: Option<ContextRetriever>,
}

impl BatchSession {
    /// A session without reference context
    pub fn new(config: &GradingConfig) -> Self {
        Self {
            cache: ResponseCache::new(ResponseCacheConfig::new(
                config.cache_max_entries,
                config.cache_ttl(),
            )),
            retriever: None,
        }
    }

    /// Attach a retriever over `documents`; blank document sets are ignored
    pub fn with_references(
        mut self,
        config: &GradingConfig,
        documents: Vec<ReferenceDocument>,
        chunker: Arc<dyn ChunkingStrategy>,
        embedder: Arc<dyn EmbeddingProvider>,
        embedding_model: &str,
    ) -> Self {
        if documents.iter().all(ReferenceDocument::is_blank) {
            return self;
        }

        let retrieval = RetrievalConfig {
            top_k: config.top_k,
            chunking: config.chunking_config(),
            max_reference_chars: config.reference_char_budget,
            embedding_model: embedding_model.to_string(),
        };
        self.retriever = Some(ContextRetriever::new(documents, chunker, embedder, retrieval));
        self
    }

    pub fn has_retriever(&self) -> bool {
        self.retriever.is_some()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::ingestion::MockChunkingStrategy;

    #[test]
    fn test_session_uses_config() {
        let config = GradingConfig {
            cache_max_entries: 7,
            ..Default::default()
        };
        let session = BatchSession::new(&config);

        assert_eq!(session.cache.config().max_entries, 7);
        assert!(!session.has_retriever());
        assert_eq!(session.cache_stats().entries, 0);
    }

    #[test]
    fn test_blank_references_skip_retriever() {
        let config = GradingConfig::default();
        let session = BatchSession::new(&config).with_references(
            &config,
            vec![ReferenceDocument::new("d", "  ")],
            Arc::new(MockChunkingStrategy::new()),
            Arc::new(MockEmbeddingProvider::new(8)),
            "mock",
        );
        assert!(!session.has_retriever());

        let session = BatchSession::new(&config).with_references(
            &config,
            vec![ReferenceDocument::new("d", "Seoul is the capital.")],
            Arc::new(MockChunkingStrategy::new()),
            Arc::new(MockEmbeddingProvider::new(8)),
            "mock",
        );
        assert!(session.has_retriever());
    }
}
