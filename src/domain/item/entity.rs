//! Item entity

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Serialized shape of an item, checked through `Item::new`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemRecord {
    id: String,
    #[serde(default)]
    class_tag: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    image_path: Option<PathBuf>,
}

/// One student's answer: text, an image, or both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ItemRecord", into = "ItemRecord")]
pub struct Item {
    id: String,
    class_tag: String,
    text: Option<String>,
    image_path: Option<PathBuf>,
}

impl Item {
    /// Create an item; at least one of `text` or `image_path` must be present
    pub fn new(
        id: impl Into<String>,
        class_tag: impl Into<String>,
        text: Option<String>,
        image_path: Option<PathBuf>,
    ) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::validation("Item id cannot be empty"));
        }

        let text = text.filter(|t| !t.trim().is_empty());
        if text.is_none() && image_path.is_none() {
            return Err(DomainError::validation(format!(
                "Item '{}' has neither a text answer nor an image",
                id
            )));
        }

        Ok(Self {
            id,
            class_tag: class_tag.into(),
            text,
            image_path,
        })
    }

    /// Create a text-only item
    pub fn text(
        id: impl Into<String>,
        class_tag: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Self::new(id, class_tag, Some(text.into()), None)
    }

    /// Create an image-only item
    pub fn image(
        id: impl Into<String>,
        class_tag: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Result<Self, DomainError> {
        Self::new(id, class_tag, None, Some(path.into()))
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn class_tag(&self) -> &str {
        &self.class_tag
    }

    pub fn text_answer(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    pub fn has_image(&self) -> bool {
        self.image_path.is_some()
    }
}

impl TryFrom<ItemRecord> for Item {
    type Error = DomainError;

    fn try_from(record: ItemRecord) -> Result<Self, Self::Error> {
        Self::new(record.id, record.class_tag, record.text, record.image_path)
    }
}

impl From<Item> for ItemRecord {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            class_tag: item.class_tag,
            text: item.text,
            image_path: item.image_path,
        }
    }
}
