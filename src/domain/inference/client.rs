//! Inference client trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use super::InferenceRequest;
use crate::domain::grading::GradingError;

/// Model endpoint that turns a grading prompt into raw response text
#[async_trait]
pub trait InferenceClient: Send + Sync + Debug {
    /// Run one inference call and return the model's text
    async fn infer(&self, request: InferenceRequest) -> Result<String, GradingError>;

    /// Get the client name
    fn client_name(&self) -> &'static str;

    /// Whether requests may carry an image
    fn supports_images(&self) -> bool {
        false
    }
}
