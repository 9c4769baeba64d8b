//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use super::{EmbeddingRequest, EmbeddingResponse};
use crate::domain::DomainError;

/// Trait for embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate embeddings for the given input
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError>;

    /// Short provider label for logs
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::embedding::Embedding;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Bag-of-words embedder: each lowercase word is hashed into one of
    /// `dimensions` buckets, so texts sharing words score as similar.
    #[derive(Debug)]
    pub struct MockEmbeddingProvider {
        dimensions: usize,
        error: Option<String>,
        calls: AtomicUsize,
        batch_sizes: Mutex<Vec<usize>>,
    }

    impl MockEmbeddingProvider {
        pub fn new(dimensions: usize) -> Self {
            Self {
                dimensions,
                error: None,
                calls: AtomicUsize::new(0),
                batch_sizes: Mutex::new(Vec::new()),
            }
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Number of inputs in each call, in call order
        pub fn batch_sizes(&self) -> Vec<usize> {
            self.batch_sizes.lock().unwrap().clone()
        }

        pub fn vectorize(&self, text: &str) -> Vec<f32> {
            let mut vector = vec![0.0; self.dimensions];
            for word in text
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
            {
                let hash = word
                    .to_lowercase()
                    .bytes()
                    .fold(5381u64, |acc, b| acc.wrapping_mul(33).wrapping_add(b as u64));
                vector[(hash % self.dimensions as u64) as usize] += 1.0;
            }
            vector
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.batch_sizes.lock().unwrap().push(request.input().len());

            if let Some(ref error) = self.error {
                return Err(DomainError::provider("mock", error));
            }

            let embeddings = request
                .inputs()
                .iter()
                .enumerate()
                .map(|(idx, text)| Embedding::new(idx, self.vectorize(text)))
                .collect();

            Ok(EmbeddingResponse::new(request.model().to_string(), embeddings))
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::domain::embedding::normalize;

        fn similarity(mut a: Vec<f32>, mut b: Vec<f32>) -> f32 {
            normalize(&mut a);
            normalize(&mut b);
            a.iter().zip(&b).map(|(x, y)| x * y).sum()
        }

        #[tokio::test]
        async fn test_mock_provider_batch_input() {
            let provider = MockEmbeddingProvider::new(64);
            let request = EmbeddingRequest::batch("mock", vec!["Hello".into(), "World".into()]);

            let response = provider.embed(request).await.unwrap();

            assert_eq!(response.embeddings().len(), 2);
            assert_eq!(response.embeddings()[0].dimensions(), 64);
            assert_eq!(provider.call_count(), 1);
            assert_eq!(provider.batch_sizes(), vec![2]);
        }

        #[tokio::test]
        async fn test_mock_provider_error() {
            let provider = MockEmbeddingProvider::new(64).with_error("API error");
            let result = provider.embed(EmbeddingRequest::single("mock", "Hello")).await;

            assert!(result.is_err());
            assert_eq!(provider.call_count(), 1);
        }

        #[test]
        fn test_shared_words_are_similar() {
            let provider = MockEmbeddingProvider::new(256);
            let query = provider.vectorize("capital of Korea");
            let close = provider.vectorize("Seoul is the capital of Korea");
            let far = provider.vectorize("volcanic island landscapes");

            assert!(similarity(query.clone(), close) > similarity(query, far));
        }
    }
}
