//! Rubric domain - User-authored grading criteria

mod entity;

pub use entity::{Criterion, Rubric, RubricElement};
