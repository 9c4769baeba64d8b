use thiserror::Error;

/// Errors outside the per-item grading path: bad input, bad configuration,
/// provider calls made while preparing a batch
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {message}")]
    Validation { message: String },

    #[error("Batch setup rejected: {}", .errors.join("; "))]
    InvalidSetup { errors: Vec<String> },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("{provider} request failed: {message}")]
    Provider { provider: String, message: String },

    #[error("Inconsistent batch report: {message}")]
    Report { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_setup(errors: Vec<String>) -> Self {
        Self::InvalidSetup { errors }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            DomainError::validation("Item id cannot be empty").to_string(),
            "Invalid input: Item id cannot be empty"
        );
        assert_eq!(
            DomainError::provider("openai", "HTTP 500").to_string(),
            "openai request failed: HTTP 500"
        );
    }

    #[test]
    fn test_invalid_setup_lists_every_error() {
        let error = DomainError::invalid_setup(vec![
            "No items to grade".to_string(),
            "Rubric 'geo' has no elements".to_string(),
        ]);
        assert_eq!(
            error.to_string(),
            "Batch setup rejected: No items to grade; Rubric 'geo' has no elements"
        );
    }
}
