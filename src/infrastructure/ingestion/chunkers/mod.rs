//! Chunking strategy implementations

mod fixed_size;
mod sentence;

pub use fixed_size::FixedSizeChunker;
pub use sentence::SentenceChunker;
