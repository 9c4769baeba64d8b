//! Infrastructure layer - External service implementations

pub mod embedding;
pub mod inference;
pub mod ingestion;
pub mod logging;
pub mod observability;
