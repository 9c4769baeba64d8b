//! Inference client implementations

mod http_client;
mod openai;

pub use http_client::{HttpClient, HttpClientTrait, HttpError};
pub use openai::{OpenAiInferenceClient, classify_http_error};

#[cfg(test)]
pub use http_client::mock::MockHttpClient;
