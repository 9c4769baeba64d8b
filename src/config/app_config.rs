use std::time::Duration;

use serde::Deserialize;

use crate::domain::grading::GradingConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub grading: GradingConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// OpenAI-compatible endpoint used for grading and embeddings
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub supports_images: bool,
    #[serde(default = "default_true")]
    pub json_mode: bool,
    /// Build a reference index when reference documents are supplied
    #[serde(default = "default_true")]
    pub retrieval_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_subject")]
    pub subject: String,
}

/// Prometheus recorder settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_subject() -> String {
    "geography".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            api_key_env: default_api_key_env(),
            request_timeout_seconds: default_request_timeout(),
            supports_images: true,
            json_mode: true,
            retrieval_enabled: true,
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.provider.chat_model, "gpt-4o-mini");
        assert_eq!(config.provider.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.prompt.subject, "geography");
        assert_eq!(config.grading.max_retries, 3);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_partial_sections_from_source() {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                r#"{
                    "logging": {"level": "debug", "format": "json"},
                    "grading": {"max_retries": 1, "top_k": 5},
                    "provider": {"chat_model": "gpt-4o"}
                }"#,
                config::FileFormat::Json,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.grading.max_retries, 1);
        assert_eq!(config.grading.top_k, 5);
        assert_eq!(config.grading.chunk_size, 500);
        assert_eq!(config.provider.chat_model, "gpt-4o");
        assert_eq!(config.provider.embedding_model, "text-embedding-3-small");
    }
}
