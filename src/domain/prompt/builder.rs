//! Prompt builder - Renders a rubric, references and an answer into one grading prompt

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::domain::item::Item;
use crate::domain::rubric::Rubric;

/// What kind of answer is being graded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingMode {
    /// Written answer, graded from its text
    #[default]
    Descriptive,
    /// Drawn or annotated answer, graded from an attached image
    Image,
}

impl GradingMode {
    /// Image mode whenever the item carries an image
    pub fn for_item(item: &Item) -> Self {
        if item.has_image() {
            Self::Image
        } else {
            Self::Descriptive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Descriptive => "descriptive",
            Self::Image => "image",
        }
    }
}

/// Builds grading prompts for a subject.
///
/// Sections, in order: role line, reference material (descriptive mode
/// only, when present), the rubric with criteria from highest to lowest
/// score, the answer, and the required JSON output format.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    subject: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new("geography")
    }
}

impl PromptBuilder {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn build(
        &self,
        rubric: &Rubric,
        answer: Option<&str>,
        references: Option<&str>,
        mode: GradingMode,
    ) -> String {
        let mut prompt = String::new();

        let _ = match mode {
            GradingMode::Descriptive => writeln!(
                prompt,
                "You are an expert {} grader. Analyze the student's written answer and grade it.",
                self.subject
            ),
            GradingMode::Image => writeln!(
                prompt,
                "You are an expert {} grader. Analyze the student's answer in the attached image and grade it.",
                self.subject
            ),
        };

        if mode == GradingMode::Descriptive {
            if let Some(block) = references.map(str::trim).filter(|b| !b.is_empty()) {
                prompt.push_str("\nUse the following reference material when grading:\n");
                prompt.push_str(block);
                prompt.push('\n');
            }
        }

        prompt.push_str("\nGrading rubric:\n");
        for element in &rubric.elements {
            let _ = writeln!(
                prompt,
                "\nElement: {} (max {} points)",
                element.name,
                element.max_score()
            );
            for criterion in element.criteria_by_score_desc() {
                let _ = writeln!(prompt, "  {} points: {}", criterion.score, criterion.description);
            }
        }

        let answer = answer.map(str::trim).filter(|a| !a.is_empty());
        match (mode, answer) {
            (GradingMode::Image, Some(text)) => {
                prompt.push_str("\nThe student's answer is in the attached image. Their written notes:\n");
                prompt.push_str(text);
                prompt.push('\n');
            }
            (GradingMode::Image, None) => {
                prompt.push_str("\nThe student's answer is in the attached image.\n");
            }
            (GradingMode::Descriptive, text) => {
                prompt.push_str("\nStudent answer:\n");
                prompt.push_str(text.unwrap_or(""));
                prompt.push('\n');
            }
        }

        prompt.push_str(&Self::output_format(rubric));
        prompt
    }

    fn output_format(rubric: &Rubric) -> String {
        let scores = rubric
            .elements
            .iter()
            .map(|e| format!("\"{}\": <score>", e.name))
            .collect::<Vec<_>>()
            .join(", ");
        let reasoning = rubric
            .elements
            .iter()
            .map(|e| format!("\"{}\": \"<why this score>\"", e.name))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "\nRespond with JSON in exactly this format:\n\
             {{\n  \"scores\": {{{scores}}},\n  \"reasoning\": {{{reasoning}}},\n  \
             \"feedback\": \"<feedback for the student>\",\n  \"total_score\": <sum of scores, at most {max}>\n}}\n\
             \nAward each element only a score listed in the rubric.\n",
            max = rubric.total_max_score()
        )
    }
}
