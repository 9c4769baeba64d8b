//! Degenerate responses for items that could not be graded

use super::{ElementAssessment, GRADING_FAILED_SENTINEL, GradingResponse};
use crate::domain::rubric::Rubric;

/// Zero-score response for every element, explaining `error`
pub fn fallback_response(rubric: &Rubric, error: &str) -> GradingResponse {
    let assessments = rubric
        .elements
        .iter()
        .map(|element| ElementAssessment {
            element: element.name.clone(),
            score: 0.0,
            reasoning: format!("No score could be assigned because grading failed: {error}"),
        })
        .collect();

    GradingResponse {
        assessments,
        feedback: format!("{GRADING_FAILED_SENTINEL}: {error}"),
        reported_total: 0.0,
        flags: Vec::new(),
    }
}
