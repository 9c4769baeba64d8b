//! OpenAI-compatible chat completions client for grading prompts

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

use super::http_client::{HttpClientTrait, HttpError};
use crate::domain::grading::GradingError;
use crate::domain::inference::{InferenceClient, InferenceRequest};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Wording providers use in 429 bodies when the account, not the rate, is exhausted
const QUOTA_MARKERS: &[&str] = &["quota", "insufficient", "billing", "credit"];

/// Map an HTTP failure onto the grading error taxonomy.
///
/// 401/403 are auth errors; 429 is a capacity error when the body talks
/// about quota and a transient one otherwise; other 4xx mean the request
/// itself is unusable; 5xx, transport and decode failures are transient.
pub fn classify_http_error(error: HttpError) -> GradingError {
    match error {
        HttpError::Status { status, body } => match status {
            401 | 403 => GradingError::auth(format!("HTTP {status}: {body}")),
            429 => {
                let lower = body.to_lowercase();
                if QUOTA_MARKERS.iter().any(|m| lower.contains(m)) {
                    GradingError::capacity(format!("HTTP 429: {body}"))
                } else {
                    GradingError::transient(format!("HTTP 429: {body}"))
                }
            }
            408 => GradingError::transient(format!("HTTP 408: {body}")),
            400..=499 => GradingError::input(format!("HTTP {status}: {body}")),
            _ => GradingError::transient(format!("HTTP {status}: {body}")),
        },
        HttpError::Transport { message, timeout } => {
            if timeout {
                GradingError::transient(format!("request timed out: {message}"))
            } else {
                GradingError::transient(message)
            }
        }
        HttpError::Decode(message) => GradingError::transient(message),
    }
}

/// Chat completions client speaking the OpenAI wire format
#[derive(Debug)]
pub struct OpenAiInferenceClient<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    json_mode: bool,
    supports_images: bool,
}

impl<C: HttpClientTrait> OpenAiInferenceClient<C> {
    pub fn new(client: C, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, model, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header,
            base_url,
            model: model.into(),
            temperature: Some(0.0),
            max_tokens: None,
            json_mode: true,
            supports_images: true,
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Ask for `response_format: json_object`; some compatible servers reject it
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }

    /// Mark the model as text-only
    pub fn text_only(mut self) -> Self {
        self.supports_images = false;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn build_request(&self, request: &InferenceRequest) -> serde_json::Value {
        let content = match &request.image {
            Some(image) => {
                let data_url = format!(
                    "data:{};base64,{}",
                    image.mime_type(),
                    STANDARD.encode(image.bytes())
                );
                serde_json::json!([
                    {"type": "text", "text": request.prompt},
                    {"type": "image_url", "image_url": {"url": data_url}}
                ])
            }
            None => serde_json::json!(request.prompt),
        };

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": content}],
        });

        if let Some(temp) = self.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if self.json_mode {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<String, GradingError> {
        let response: OpenAiChatResponse = serde_json::from_value(json).map_err(|e| {
            GradingError::transient(format!("Failed to parse chat response: {}", e))
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GradingError::transient("model returned an empty response"))
    }
}

#[async_trait]
impl<C: HttpClientTrait> InferenceClient for OpenAiInferenceClient<C> {
    async fn infer(&self, request: InferenceRequest) -> Result<String, GradingError> {
        if request.has_image() && !self.supports_images {
            return Err(GradingError::input(format!(
                "model '{}' does not accept images",
                self.model
            )));
        }

        let body = self.build_request(&request);
        let response = self
            .client
            .post_json(&self.chat_completions_url(), self.headers(), &body)
            .await
            .map_err(classify_http_error)?;

        self.parse_response(response)
    }

    fn client_name(&self) -> &'static str {
        "openai"
    }

    fn supports_images(&self) -> bool {
        self.supports_images
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    content: Option<String>,
}
