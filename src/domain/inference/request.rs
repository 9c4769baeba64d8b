//! Inference request types

use std::fmt;
use std::path::Path;

use crate::domain::cache::hash_bytes;
use crate::domain::grading::GradingError;

/// Image bytes attached to an inference request
#[derive(Clone, PartialEq, Eq)]
pub struct ImageInput {
    bytes: Vec<u8>,
    mime_type: String,
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Read an image file, guessing its MIME type from the extension
    pub async fn load(path: &Path) -> Result<Self, GradingError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            GradingError::input(format!("cannot read image '{}': {}", path.display(), e))
        })?;

        if bytes.is_empty() {
            return Err(GradingError::input(format!(
                "image '{}' is empty",
                path.display()
            )));
        }

        let mime_type = mime_guess::from_path(path)
            .first()
            .filter(|m| m.type_() == mime_guess::mime::IMAGE)
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "image/png".to_string());

        Ok(Self::new(bytes, mime_type))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// SHA-256 of the image content, used in response cache keys
    pub fn content_hash(&self) -> String {
        hash_bytes(&self.bytes)
    }
}

impl fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageInput")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// A single prompt, optionally with an image, sent to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceRequest {
    pub prompt: String,
    pub image: Option<ImageInput>,
}

impl InferenceRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.image = Some(image);
        self
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}
