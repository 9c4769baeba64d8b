//! Domain layer - Core grading logic and entities

pub mod cache;
pub mod embedding;
pub mod error;
pub mod grading;
pub mod inference;
pub mod ingestion;
pub mod item;
pub mod prompt;
pub mod retrieval;
pub mod rubric;
pub mod validation;

pub use error::DomainError;
pub use grading::{
    BatchReport, CancellationHandle, GradingConfig, GradingError, GradingEvent,
    GradingOrchestrator, GradingResult, GradingStatus,
};
pub use item::Item;
pub use retrieval::ReferenceDocument;
pub use rubric::{Criterion, Rubric, RubricElement};
