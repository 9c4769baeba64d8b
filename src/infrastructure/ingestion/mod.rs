//! Chunking implementations for reference documents

pub mod chunkers;
pub mod factory;

pub use chunkers::{FixedSizeChunker, SentenceChunker};
pub use factory::ChunkerFactory;
