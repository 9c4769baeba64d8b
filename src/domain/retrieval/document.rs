//! Reference documents and search hits

use serde::{Deserialize, Serialize};

use crate::domain::ingestion::Chunk;

/// Already-extracted reference text supplied with a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDocument {
    pub id: String,
    pub content: String,
}

impl ReferenceDocument {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// A chunk returned by a similarity search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    /// Inner product of the normalized query and chunk vectors
    pub score: f32,
}
