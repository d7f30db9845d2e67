//! JSON bodies of the HTTP API that are not library types.

use chrono::{DateTime, Utc};
use docqa_rag::CollectionInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Readiness of the vector index.
///
/// `status` is `ready` when the collection answered, `degraded` otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub index_connected: bool,
    pub collection_info: CollectionReport,
}

/// Collection statistics, or why they could not be fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectionReport {
    Info(CollectionInfo),
    Unavailable { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUploadResponse {
    pub message: String,
    pub filename: String,
    pub chunks_created: usize,
    /// IDs of the stored chunks.
    pub document_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub collection_name: String,
    /// Number of stored chunks.
    pub total_documents: u64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error kind, e.g. `RetrievalFailed`.
    pub error: String,
    pub message: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    /// Always `Validation Error`.
    pub error: String,
    pub message: String,
    pub errors: Vec<FieldError>,
}
