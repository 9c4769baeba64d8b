//! Validated grading response types

use serde::{Deserialize, Serialize};

/// Phrase that opens the feedback of every fallback response
pub const GRADING_FAILED_SENTINEL: &str = "An error occurred during grading";

/// Reasoning used when the model omitted it for an element
pub const MISSING_REASONING_PLACEHOLDER: &str = "No reasoning was provided for this score.";

/// Non-fatal anomaly found while validating a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "flag", rename_all = "snake_case")]
pub enum ValidationFlag {
    /// Score is not one of the element's declared discrete scores
    OffRubricScore {
        element: String,
        score: f64,
        allowed: Vec<u32>,
    },
    /// Reasoning was missing and has been backfilled
    MissingReasoning { element: String },
    /// The model's own total disagrees with the sum of its element scores
    TotalMismatch { reported: f64, computed: f64 },
}

/// Score and reasoning for one rubric element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementAssessment {
    pub element: String,
    pub score: f64,
    pub reasoning: String,
}

/// A model response that passed validation, with assessments in rubric order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResponse {
    pub assessments: Vec<ElementAssessment>,
    pub feedback: String,
    pub reported_total: f64,
    #[serde(default)]
    pub flags: Vec<ValidationFlag>,
}

impl GradingResponse {
    /// Sum of element scores as reported by the model
    pub fn score_sum(&self) -> f64 {
        self.assessments.iter().map(|a| a.score).sum()
    }

    pub fn assessment(&self, element: &str) -> Option<&ElementAssessment> {
        self.assessments.iter().find(|a| a.element == element)
    }

    /// A zero-score response whose feedback carries the failure sentinel
    pub fn is_failure_sentinel(&self) -> bool {
        self.score_sum() == 0.0 && self.feedback.contains(GRADING_FAILED_SENTINEL)
    }

    pub fn has_flags(&self) -> bool {
        !self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(score: f64, feedback: &str) -> GradingResponse {
        GradingResponse {
            assessments: vec![ElementAssessment {
                element: "accuracy".into(),
                score,
                reasoning: "r".into(),
            }],
            feedback: feedback.into(),
            reported_total: score,
            flags: vec![],
        }
    }

    #[test]
    fn test_failure_sentinel_requires_zero_total() {
        let feedback = format!("{GRADING_FAILED_SENTINEL}: timeout");
        assert!(response(0.0, &feedback).is_failure_sentinel());
        assert!(!response(3.0, &feedback).is_failure_sentinel());
        assert!(!response(0.0, "Needs more detail.").is_failure_sentinel());
    }

    #[test]
    fn test_score_sum_and_lookup() {
        let r = response(3.0, "ok");
        assert_eq!(r.score_sum(), 3.0);
        assert_eq!(r.assessment("accuracy").unwrap().reasoning, "r");
        assert!(r.assessment("clarity").is_none());
    }
}
