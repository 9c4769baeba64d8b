//! OpenAI-compatible `/v1/embeddings` client used to index reference documents

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::DomainError;
use crate::domain::embedding::{Embedding, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse};
use crate::infrastructure::inference::HttpClientTrait;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const PROVIDER: &str = "openai";

/// Inputs per HTTP call; the public API rejects larger arrays
const DEFAULT_MAX_BATCH_SIZE: usize = 2048;

#[derive(Debug, Serialize)]
struct EmbeddingsBody<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsReply {
    model: String,
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedding provider for OpenAI and servers that copy its wire format.
///
/// Large requests are split into sub-batches of at most `max_batch_size`
/// inputs. Vectors come back in input order whatever order the server
/// lists them in.
#[derive(Debug)]
pub struct OpenAiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    bearer: String,
    endpoint: String,
    max_batch_size: usize,
}

impl<C: HttpClientTrait> OpenAiEmbeddingProvider<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            bearer: format!("Bearer {}", api_key.into()),
            endpoint: format!("{}/v1/embeddings", base_url.trim_end_matches('/')),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.max(1);
        self
    }

    async fn embed_slice(
        &self,
        model: &str,
        texts: &[&str],
    ) -> Result<(String, Vec<Vec<f32>>), DomainError> {
        let body = serde_json::to_value(EmbeddingsBody {
            model,
            input: texts,
        })
        .map_err(|e| DomainError::provider(PROVIDER, e.to_string()))?;

        let headers = vec![
            ("Authorization", self.bearer.as_str()),
            ("Content-Type", "application/json"),
        ];
        let json = self
            .client
            .post_json(&self.endpoint, headers, &body)
            .await
            .map_err(|e| DomainError::provider(PROVIDER, e.to_string()))?;

        let reply: EmbeddingsReply = serde_json::from_value(json).map_err(|e| {
            DomainError::provider(PROVIDER, format!("malformed embeddings reply: {e}"))
        })?;

        Ok((reply.model, order_rows(reply.data, texts.len())?))
    }
}

/// Place each row at its `index`, requiring exactly one row per input
fn order_rows(rows: Vec<EmbeddingRow>, expected: usize) -> Result<Vec<Vec<f32>>, DomainError> {
    if rows.len() != expected {
        return Err(DomainError::provider(
            PROVIDER,
            format!("expected {expected} embeddings, got {}", rows.len()),
        ));
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for row in rows {
        let slot = slots
            .get_mut(row.index)
            .filter(|slot| slot.is_none())
            .ok_or_else(|| {
                DomainError::provider(
                    PROVIDER,
                    format!("embedding index {} is out of range or repeated", row.index),
                )
            })?;
        *slot = Some(row.embedding);
    }

    Ok(slots.into_iter().flatten().collect())
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OpenAiEmbeddingProvider<C> {
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, DomainError> {
        if request.input().is_empty() {
            return Ok(EmbeddingResponse::new(request.model().to_string(), Vec::new()));
        }

        let texts = request.inputs();
        let mut model = request.model().to_string();
        let mut embeddings = Vec::with_capacity(texts.len());

        for (n, slice) in texts.chunks(self.max_batch_size).enumerate() {
            debug!(batch = n, inputs = slice.len(), "Requesting embeddings");
            let (served_by, vectors) = self.embed_slice(request.model(), slice).await?;
            model = served_by;

            let offset = embeddings.len();
            embeddings.extend(
                vectors
                    .into_iter()
                    .enumerate()
                    .map(|(i, vector)| Embedding::new(offset + i, vector)),
            );
        }

        if let Some(first) = embeddings.first() {
            let dimension = first.dimensions();
            if let Some(odd) = embeddings.iter().find(|e| e.dimensions() != dimension) {
                return Err(DomainError::provider(
                    PROVIDER,
                    format!(
                        "embedding dimension changed from {dimension} to {} within one request",
                        odd.dimensions()
                    ),
                ));
            }
        }

        Ok(EmbeddingResponse::new(model, embeddings))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
