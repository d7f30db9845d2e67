//! Retrieval-augmented question answering.
//!
//! `docqa-rag` answers natural-language questions from a document collection:
//! the [`Retriever`] pulls the most similar passages out of a
//! [`VectorStore`], a [`Generator`] writes an answer grounded in them, and an
//! optional [`Evaluator`] scores the answer for faithfulness and relevancy.
//! [`QueryPipeline`] ties the three together under timeouts; [`Ingestor`]
//! fills the collection in the first place.
//!
//! Backends are pluggable. Always available:
//! - [`InMemoryVectorStore`]
//! - [`EmbeddingEvaluator`]
//!
//! Behind features:
//! - `openai` – [`openai::OpenAIEmbeddingProvider`] and [`openai::OpenAIGenerator`]
//! - `qdrant` – [`qdrant::QdrantVectorStore`]

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod evaluation;
pub mod generation;
pub mod inmemory;
pub mod ingest;
pub mod pipeline;
pub mod query;
pub mod retriever;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::{Chunker, FixedSizeChunker, MarkdownChunker, RecursiveChunker, chunker_for};
pub use config::{ChunkingConfig, PipelineConfig, PipelineConfigBuilder};
pub use document::{Chunk, CollectionInfo, Document, SearchResult};
pub use embedding::{EmbeddingProvider, cosine_similarity};
pub use error::{QueryError, RagError, Result};
pub use evaluation::{EmbeddingEvaluator, Evaluator, Scores, score_with_timeout};
pub use generation::{Generator, NO_CONTEXT_ANSWER, build_grounded_prompt};
pub use inmemory::InMemoryVectorStore;
pub use ingest::Ingestor;
pub use pipeline::{QueryPipeline, QueryPipelineBuilder, QueryStage};
pub use query::{
    EvaluationScore, MAX_QUESTION_CHARS, Query, QueryRequest, QueryResult, SourcePassage,
};
pub use retriever::Retriever;
pub use vectorstore::VectorStore;
