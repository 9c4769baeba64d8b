//! Per-item grading errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures that can end a single grading attempt
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GradingError {
    #[error("Parsing error: {message}")]
    Parsing { message: String },

    #[error("Schema error: missing required fields: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Type error: {message}")]
    Type { message: String },

    #[error("Model reported a grading failure: {feedback}")]
    FailedResponse { feedback: String },

    #[error("Inference error: {message}")]
    TransientInference { message: String },

    #[error("Authentication error: {message}")]
    Auth { message: String },

    #[error("Capacity error: {message}")]
    Capacity { message: String },

    #[error("Input error: {message}")]
    Input { message: String },
}

impl GradingError {
    pub fn parsing(message: impl Into<String>) -> Self {
        Self::Parsing {
            message: message.into(),
        }
    }

    pub fn schema(missing: Vec<String>) -> Self {
        Self::Schema { missing }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
        }
    }

    pub fn failed_response(feedback: impl Into<String>) -> Self {
        Self::FailedResponse {
            feedback: feedback.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientInference {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn capacity(message: impl Into<String>) -> Self {
        Self::Capacity {
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Parsing { .. }
                | Self::Schema { .. }
                | Self::Type { .. }
                | Self::FailedResponse { .. }
                | Self::TransientInference { .. }
        )
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parsing { .. } => "parsing",
            Self::Schema { .. } => "schema",
            Self::Type { .. } => "type",
            Self::FailedResponse { .. } => "failed_response",
            Self::TransientInference { .. } => "transient_inference",
            Self::Auth { .. } => "auth",
            Self::Capacity { .. } => "capacity",
            Self::Input { .. } => "input",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(GradingError::parsing("bad json").is_retryable());
        assert!(GradingError::schema(vec!["feedback".into()]).is_retryable());
        assert!(GradingError::type_mismatch("not a number").is_retryable());
        assert!(GradingError::failed_response("sentinel").is_retryable());
        assert!(GradingError::transient("timeout").is_retryable());

        assert!(!GradingError::auth("bad key").is_retryable());
        assert!(!GradingError::capacity("quota").is_retryable());
        assert!(!GradingError::input("missing file").is_retryable());
    }

    #[test]
    fn test_schema_message_lists_fields() {
        let error = GradingError::schema(vec!["feedback".into(), "total_score".into()]);
        assert_eq!(
            error.to_string(),
            "Schema error: missing required fields: feedback, total_score"
        );
    }

    #[test]
    fn test_serialize_tagged() {
        let json = serde_json::to_value(GradingError::auth("401")).unwrap();
        assert_eq!(json["kind"], "auth");
        assert_eq!(json["message"], "401");
    }
}
