//! Graded result types

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::item::Item;
use crate::domain::rubric::Rubric;
use crate::domain::validation::{GradingResponse, ValidationFlag};

/// Awarded score for one rubric element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementScore {
    pub element_name: String,
    pub score: f64,
    pub max_score: u32,
    pub reasoning: String,
}

impl ElementScore {
    pub fn percentage(&self) -> f64 {
        if self.max_score == 0 {
            return 0.0;
        }
        self.score * 100.0 / f64::from(self.max_score)
    }
}

/// Final result for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub item_id: String,
    pub class_tag: String,
    pub element_scores: Vec<ElementScore>,
    pub total_score: f64,
    pub total_max_score: u32,
    pub feedback: String,
    pub duration_seconds: f64,
    pub graded_at: DateTime<Utc>,
    pub is_fallback: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<ValidationFlag>,
}

impl GradingResult {
    /// Assemble a result for `item` in rubric order.
    ///
    /// Each score is clamped into `[0, max_score]` and the total is the sum
    /// of the clamped scores, whatever total the model reported.
    pub fn assemble(
        item: &Item,
        rubric: &Rubric,
        response: &GradingResponse,
        duration: Duration,
        is_fallback: bool,
    ) -> Self {
        let element_scores: Vec<ElementScore> = rubric
            .elements
            .iter()
            .map(|element| {
                let max_score = element.max_score();
                let (score, reasoning) = match response.assessment(&element.name) {
                    Some(a) => (a.score.clamp(0.0, f64::from(max_score)), a.reasoning.clone()),
                    None => (0.0, String::new()),
                };
                ElementScore {
                    element_name: element.name.clone(),
                    score,
                    max_score,
                    reasoning,
                }
            })
            .collect();

        let total_score = element_scores.iter().map(|e| e.score).sum();

        Self {
            item_id: item.id().to_string(),
            class_tag: item.class_tag().to_string(),
            element_scores,
            total_score,
            total_max_score: rubric.total_max_score(),
            feedback: response.feedback.clone(),
            duration_seconds: duration.as_secs_f64(),
            graded_at: Utc::now(),
            is_fallback,
            flags: response.flags.clone(),
        }
    }

    pub fn percentage(&self) -> f64 {
        if self.total_max_score == 0 {
            return 0.0;
        }
        self.total_score * 100.0 / f64::from(self.total_max_score)
    }

    /// Letter grade from the percentage: A ≥ 90, B ≥ 80, C ≥ 70, D ≥ 60, else F
    pub fn letter_grade(&self) -> char {
        match self.percentage() {
            p if p >= 90.0 => 'A',
            p if p >= 80.0 => 'B',
            p if p >= 70.0 => 'C',
            p if p >= 60.0 => 'D',
            _ => 'F',
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_seconds.max(0.0))
    }

    pub fn element(&self, name: &str) -> Option<&ElementScore> {
        self.element_scores.iter().find(|e| e.element_name == name)
    }
}
