//! Rubric grader
//!
//! Grades student answers against a user-authored rubric with an LLM:
//! - Sequential per-item orchestration with retries and cooperative cancellation
//! - Reference context retrieval over chunked, embedded documents
//! - Response caching and validation of model output against the rubric

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use domain::DomainError;
use domain::grading::GradingOrchestrator;
use domain::prompt::PromptBuilder;
use infrastructure::embedding::OpenAiEmbeddingProvider;
use infrastructure::inference::{HttpClient, OpenAiInferenceClient};
use infrastructure::ingestion::ChunkerFactory;
use tracing::info;

/// Wire an orchestrator against the configured OpenAI-compatible endpoint
pub fn build_orchestrator(config: &AppConfig) -> Result<GradingOrchestrator, DomainError> {
    config.grading.validate()?;

    let provider = &config.provider;
    let api_key = provider.api_key().ok_or_else(|| {
        DomainError::configuration(format!(
            "API key not found in environment variable {}",
            provider.api_key_env
        ))
    })?;

    let http = HttpClient::with_timeout(provider.request_timeout())
        .map_err(|e| DomainError::configuration(e.to_string()))?;

    let mut client = OpenAiInferenceClient::with_base_url(
        http.clone(),
        api_key.clone(),
        provider.chat_model.clone(),
        provider.base_url.clone(),
    )
    .with_json_mode(provider.json_mode);
    if !provider.supports_images {
        client = client.text_only();
    }

    let mut orchestrator = GradingOrchestrator::new(Arc::new(client), config.grading.clone())
        .with_prompt_builder(PromptBuilder::new(config.prompt.subject.clone()));

    if provider.retrieval_enabled {
        let embedder =
            OpenAiEmbeddingProvider::with_base_url(http, api_key, provider.base_url.clone());
        orchestrator = orchestrator.with_retrieval(
            Arc::new(embedder),
            ChunkerFactory::create(config.grading.chunking_strategy),
            provider.embedding_model.clone(),
        );
    }

    info!(
        model = %provider.chat_model,
        base_url = %provider.base_url,
        retrieval = provider.retrieval_enabled,
        "Grading orchestrator configured"
    );
    Ok(orchestrator)
}
