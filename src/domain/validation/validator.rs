//! Response validator - Parses raw model text into a `GradingResponse`

use serde_json::{Map, Value};
use tracing::warn;

use super::{ElementAssessment, GradingResponse, MISSING_REASONING_PLACEHOLDER, ValidationFlag};
use crate::domain::grading::GradingError;
use crate::domain::rubric::Rubric;

/// Top-level keys every response must carry, in reporting order
pub const REQUIRED_FIELDS: [&str; 4] = ["scores", "reasoning", "feedback", "total_score"];

/// Slice from the first `{` to the last `}` of `text`
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start < end {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// Checks raw model output against a rubric.
///
/// Structural problems (no JSON, missing keys, non-numeric scores) are
/// errors. Off-rubric scores and missing reasoning are accepted and
/// recorded as [`ValidationFlag`]s.
#[derive(Debug, Clone, Default)]
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, raw: &str, rubric: &Rubric) -> Result<GradingResponse, GradingError> {
        let json = extract_json(raw).ok_or_else(|| {
            GradingError::parsing(format!(
                "no JSON object found in response ({} characters)",
                raw.len()
            ))
        })?;

        let value: Value = serde_json::from_str(json)
            .map_err(|e| GradingError::parsing(format!("invalid JSON in response: {e}")))?;

        let object = value
            .as_object()
            .ok_or_else(|| GradingError::parsing("response JSON is not an object"))?;

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|field| !object.contains_key(**field))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(GradingError::schema(missing));
        }

        let scores = Self::object_field(object, "scores")?;
        let reasoning = Self::object_field(object, "reasoning")?;

        let feedback = object["feedback"]
            .as_str()
            .ok_or_else(|| GradingError::type_mismatch("`feedback` must be a string"))?
            .to_string();

        let reported_total = object["total_score"]
            .as_f64()
            .ok_or_else(|| GradingError::type_mismatch("`total_score` must be a number"))?;

        let missing_scores: Vec<String> = rubric
            .elements
            .iter()
            .filter(|element| !scores.contains_key(&element.name))
            .map(|element| format!("scores.{}", element.name))
            .collect();
        if !missing_scores.is_empty() {
            return Err(GradingError::schema(missing_scores));
        }

        let mut flags = Vec::new();
        let mut assessments = Vec::with_capacity(rubric.elements.len());

        for element in &rubric.elements {
            let raw_score = &scores[&element.name];
            let score = raw_score.as_f64().ok_or_else(|| {
                GradingError::type_mismatch(format!(
                    "score for `{}` must be a number, got {}",
                    element.name, raw_score
                ))
            })?;

            if !element.declares(score) {
                warn!(
                    element = %element.name,
                    score,
                    allowed = ?element.allowed_scores(),
                    "Score not declared by rubric"
                );
                flags.push(ValidationFlag::OffRubricScore {
                    element: element.name.clone(),
                    score,
                    allowed: element.allowed_scores(),
                });
            }

            let element_reasoning = match reasoning.get(&element.name).and_then(Value::as_str) {
                Some(text) if !text.trim().is_empty() => text.to_string(),
                _ => {
                    flags.push(ValidationFlag::MissingReasoning {
                        element: element.name.clone(),
                    });
                    MISSING_REASONING_PLACEHOLDER.to_string()
                }
            };

            assessments.push(ElementAssessment {
                element: element.name.clone(),
                score,
                reasoning: element_reasoning,
            });
        }

        let computed: f64 = assessments.iter().map(|a| a.score).sum();
        if (computed - reported_total).abs() > f64::EPSILON {
            flags.push(ValidationFlag::TotalMismatch {
                reported: reported_total,
                computed,
            });
        }

        Ok(GradingResponse {
            assessments,
            feedback,
            reported_total,
            flags,
        })
    }

    fn object_field<'a>(
        object: &'a Map<String, Value>,
        field: &str,
    ) -> Result<&'a Map<String, Value>, GradingError> {
        object[field]
            .as_object()
            .ok_or_else(|| GradingError::type_mismatch(format!("`{field}` must be an object")))
    }
}
