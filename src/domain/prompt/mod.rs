//! Grading prompt construction

mod builder;

pub use builder::{GradingMode, PromptBuilder};
