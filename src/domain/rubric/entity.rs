//! Rubric, element and criterion types

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A discrete score an element can award, with its description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub score: u32,
    pub description: String,
}

impl Criterion {
    pub fn new(score: u32, description: impl Into<String>) -> Self {
        Self {
            score,
            description: description.into(),
        }
    }
}

/// A named rubric element with its ordered scoring criteria
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricElement {
    pub name: String,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
}

impl RubricElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            criteria: Vec::new(),
        }
    }

    pub fn with_criterion(mut self, score: u32, description: impl Into<String>) -> Self {
        self.criteria.push(Criterion::new(score, description));
        self
    }

    /// Highest declared score, 0 when no criteria exist
    pub fn max_score(&self) -> u32 {
        self.criteria.iter().map(|c| c.score).max().unwrap_or(0)
    }

    /// Declared scores in declaration order
    pub fn allowed_scores(&self) -> Vec<u32> {
        self.criteria.iter().map(|c| c.score).collect()
    }

    /// Whether `score` is exactly one of the declared discrete scores
    pub fn declares(&self, score: f64) -> bool {
        self.criteria.iter().any(|c| f64::from(c.score) == score)
    }

    /// Criteria ordered from highest to lowest score
    pub fn criteria_by_score_desc(&self) -> Vec<&Criterion> {
        let mut criteria: Vec<&Criterion> = self.criteria.iter().collect();
        criteria.sort_by(|a, b| b.score.cmp(&a.score));
        criteria
    }
}

/// User-authored grading rubric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rubric {
    pub name: String,
    #[serde(default)]
    pub elements: Vec<RubricElement>,
}

impl Rubric {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: RubricElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Sum of element maxima
    pub fn total_max_score(&self) -> u32 {
        self.elements.iter().map(RubricElement::max_score).sum()
    }

    pub fn element(&self, name: &str) -> Option<&RubricElement> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn element_names(&self) -> Vec<&str> {
        self.elements.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Check names and descriptions are non-empty and element names unique
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("Rubric name cannot be empty"));
        }

        let mut seen = HashSet::new();
        for element in &self.elements {
            if element.name.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "Rubric '{}' has an element with an empty name",
                    self.name
                )));
            }

            if !seen.insert(element.name.as_str()) {
                return Err(DomainError::validation(format!(
                    "Duplicate rubric element '{}'",
                    element.name
                )));
            }

            if let Some(criterion) = element
                .criteria
                .iter()
                .find(|c| c.description.trim().is_empty())
            {
                return Err(DomainError::validation(format!(
                    "Element '{}' has an empty description for score {}",
                    element.name, criterion.score
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rubric() -> Rubric {
        Rubric::new("Regional geography")
            .with_element(
                RubricElement::new("accuracy")
                    .with_criterion(0, "No correct facts")
                    .with_criterion(3, "Some correct facts")
                    .with_criterion(5, "All facts correct"),
            )
            .with_element(
                RubricElement::new("clarity")
                    .with_criterion(2, "Clear")
                    .with_criterion(0, "Unclear"),
            )
    }

    #[test]
    fn test_max_scores() {
        let rubric = sample_rubric();
        assert_eq!(rubric.element("accuracy").unwrap().max_score(), 5);
        assert_eq!(rubric.element("clarity").unwrap().max_score(), 2);
        assert_eq!(rubric.total_max_score(), 7);
    }

    #[test]
    fn test_element_without_criteria_has_zero_max() {
        let rubric = Rubric::new("r").with_element(RubricElement::new("empty"));
        assert_eq!(rubric.total_max_score(), 0);
    }

    #[test]
    fn test_declares() {
        let rubric = sample_rubric();
        let accuracy = rubric.element("accuracy").unwrap();
        assert!(accuracy.declares(3.0));
        assert!(!accuracy.declares(2.0));
        assert!(!accuracy.declares(3.5));
    }

    #[test]
    fn test_criteria_by_score_desc() {
        let rubric = sample_rubric();
        let scores: Vec<u32> = rubric.elements[1]
            .criteria_by_score_desc()
            .iter()
            .map(|c| c.score)
            .collect();
        assert_eq!(scores, vec![2, 0]);
    }

    #[test]
    fn test_validate() {
        assert!(sample_rubric().validate().is_ok());

        let duplicate = sample_rubric().with_element(RubricElement::new("accuracy"));
        assert!(duplicate.validate().is_err());

        let blank = Rubric::new("r").with_element(RubricElement::new("  "));
        assert!(blank.validate().is_err());

        let no_description =
            Rubric::new("r").with_element(RubricElement::new("a").with_criterion(1, ""));
        assert!(no_description.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = r#"{
            "name": "Map reading",
            "elements": [
                {"name": "legend", "criteria": [
                    {"score": 4, "description": "Legend complete"},
                    {"score": 0, "description": "Legend missing"}
                ]}
            ]
        }"#;

        let rubric: Rubric = serde_json::from_str(json).unwrap();

        assert_eq!(rubric.element_names(), vec!["legend"]);
        assert_eq!(rubric.total_max_score(), 4);
    }

    #[test]
    fn test_negative_score_rejected_on_deserialize() {
        let json = r#"{"name": "r", "elements": [{"name": "a", "criteria": [{"score": -1, "description": "x"}]}]}"#;
        assert!(serde_json::from_str::<Rubric>(json).is_err());
    }
}
