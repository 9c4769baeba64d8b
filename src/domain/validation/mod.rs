//! Validation of raw model output against a rubric

mod fallback;
mod response;
mod validator;

pub use fallback::fallback_response;
pub use response::{
    ElementAssessment, GRADING_FAILED_SENTINEL, GradingResponse, MISSING_REASONING_PLACEHOLDER,
    ValidationFlag,
};
pub use validator::{REQUIRED_FIELDS, ResponseValidator, extract_json};
