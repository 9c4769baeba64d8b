//! Retrieval domain - Reference documents, vector index and top-k context lookup

mod document;
mod index;
mod preprocess;
mod retriever;

pub use document::{ReferenceDocument, SearchHit};
pub use index::{ContextIndex, IndexError};
pub use preprocess::preprocess_text;
pub use retriever::{ContextRetriever, RetrievalConfig, format_references};
