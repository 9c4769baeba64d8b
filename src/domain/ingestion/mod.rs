//! Chunking domain types and traits
//!
//! This module provides:
//! - `ChunkingStrategy` trait for splitting reference text into chunks
//! - Configuration and chunk types shared by every strategy

pub mod chunker;

pub use chunker::{Chunk, ChunkMetadata, ChunkingConfig, ChunkingStrategy, ChunkingType};

#[cfg(test)]
pub use chunker::mock::MockChunkingStrategy;
