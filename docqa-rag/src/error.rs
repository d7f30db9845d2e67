//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors raised by the individual RAG components.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector index could not be reached or answered with an error.
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// The generation model failed or returned an unusable response.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An evaluator could not compute its scores.
    #[error("Evaluation error ({evaluator}): {message}")]
    EvaluationError {
        /// The evaluator that produced the error.
        evaluator: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error while ingesting documents.
    #[error("Ingestion error: {0}")]
    IngestionError(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

/// The ways a single query can fail.
///
/// Evaluation problems never show up here; they are reported inline on the
/// [`EvaluationScore`](crate::query::EvaluationScore) of a successful result.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The request was malformed. Raised before any component runs.
    #[error("invalid {field}: {message}")]
    Validation {
        /// The offending request field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The vector index could not be queried.
    #[error("retrieval failed: {0}")]
    RetrievalFailed(String),

    /// The generation model failed or timed out.
    #[error("generation failed: {0}")]
    GenerationFailed(String),
}

impl QueryError {
    /// Stable identifier of the error kind, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "ValidationError",
            Self::RetrievalFailed(_) => "RetrievalFailed",
            Self::GenerationFailed(_) => "GenerationFailed",
        }
    }
}
