//! What gets indexed (documents split into chunks) and what comes back out
//! of a vector store (scored chunks and collection statistics).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata key holding the file name a document was uploaded as.
pub const SOURCE_KEY: &str = "source";

/// A whole uploaded text, before chunking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    /// Copied onto every chunk of the document.
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// A document for an uploaded file, under a fresh UUID, with the file
    /// name recorded as its `source`.
    pub fn from_upload(filename: &str, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            metadata: HashMap::from([(SOURCE_KEY.to_string(), filename.to_string())]),
        }
    }

    /// The file name the document came from, or its ID when unknown.
    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map_or(&self.id, String::as_str)
    }
}

/// One embedded piece of a [`Document`]; the unit stored in and returned by
/// a [`VectorStore`](crate::VectorStore).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    /// Empty until the chunk has been embedded. Stores may also return it
    /// empty from a search.
    pub embedding: Vec<f32>,
    /// Document metadata plus `chunk_index` (and `header_path` for Markdown).
    pub metadata: HashMap<String, String>,
    pub document_id: String,
}

/// A chunk returned by a similarity search. Higher `score` is closer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
}

/// Size and health of a collection, as reported by `/ready`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    pub points_count: u64,
    /// Backend status string, e.g. `green`.
    pub status: String,
}
