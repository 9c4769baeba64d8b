//! Grading configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RetryPolicy;
use crate::domain::DomainError;
use crate::domain::ingestion::{ChunkingConfig, ChunkingType};

/// Tunables for a grading batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff base in seconds
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay: f64,
    /// Longest single backoff wait in seconds
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_seconds: u64,
    #[serde(default)]
    pub chunking_strategy: ChunkingType,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Characters kept from each retrieved chunk in the prompt
    #[serde(default = "default_reference_char_budget")]
    pub reference_char_budget: usize,
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
    /// Batches larger than this produce a setup warning
    #[serde(default = "default_large_batch_threshold")]
    pub large_batch_threshold: usize,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay() -> f64 {
    2.0
}

fn default_retry_max_delay() -> u64 {
    300
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_min_chunk_size() -> usize {
    10
}

fn default_top_k() -> usize {
    3
}

fn default_reference_char_budget() -> usize {
    300
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    100
}

fn default_large_batch_threshold() -> usize {
    50
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_delay: default_retry_base_delay(),
            retry_max_delay_seconds: default_retry_max_delay(),
            chunking_strategy: ChunkingType::default(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_size: default_min_chunk_size(),
            top_k: default_top_k(),
            reference_char_budget: default_reference_char_budget(),
            cache_ttl_seconds: default_cache_ttl_seconds(),
            cache_max_entries: default_cache_max_entries(),
            large_batch_threshold: default_large_batch_threshold(),
        }
    }
}

impl GradingConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_base_delay)
            .with_max_delay(Duration::from_secs(self.retry_max_delay_seconds))
    }

    pub fn chunking_config(&self) -> ChunkingConfig {
        ChunkingConfig::new(self.chunk_size, self.chunk_overlap)
            .with_min_chunk_size(self.min_chunk_size)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.retry_base_delay.is_nan() || self.retry_base_delay <= 0.0 {
            return Err(DomainError::configuration(
                "retry_base_delay must be greater than 0",
            ));
        }

        if self.top_k == 0 {
            return Err(DomainError::configuration("top_k must be greater than 0"));
        }

        if self.cache_max_entries == 0 {
            return Err(DomainError::configuration(
                "cache_max_entries must be greater than 0",
            ));
        }

        self.chunking_config()
            .validate()
            .map_err(|e| DomainError::configuration(e.to_string()))
    }
}
