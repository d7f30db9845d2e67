//! Query pipeline orchestrator.
//!
//! The [`QueryPipeline`] answers one [`Query`] by composing a [`Retriever`],
//! a [`Generator`], and an optional [`Evaluator`]:
//!
//! ```text
//! Start → Retrieving → Generating → (Evaluating | Skipped) → Done | Failed
//! ```
//!
//! Retrieval and generation failures abort the query. Evaluation failures
//! never do; they are reported on the result. Nothing is retried here.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{InMemoryVectorStore, PipelineConfig, Query, QueryPipeline};
//!
//! let pipeline = QueryPipeline::builder()
//!     .config(PipelineConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .collection("docs")
//!     .generator(Arc::new(my_generator))
//!     .build()?;
//!
//! let result = pipeline.answer(&Query::new("What is RAG?", true, false)?).await?;
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::config::PipelineConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{QueryError, RagError, Result};
use crate::evaluation::{Evaluator, elapsed_ms, score_with_timeout};
use crate::generation::{Generator, NO_CONTEXT_ANSWER};
use crate::query::{EvaluationScore, Query, QueryResult, SourcePassage};
use crate::retriever::Retriever;
use crate::vectorstore::VectorStore;

/// The stage a query is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    /// Fetching passages from the vector index.
    Retrieving,
    /// Waiting on the generation model.
    Generating,
    /// Scoring the answer.
    Evaluating,
    /// Evaluation was not requested.
    Skipped,
    /// The result has been assembled.
    Done,
    /// Retrieval or generation failed.
    Failed,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Retrieving => "retrieving",
            Self::Generating => "generating",
            Self::Evaluating => "evaluating",
            Self::Skipped => "skipped",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Answers questions: retrieve → generate → (optionally) evaluate.
///
/// The pipeline keeps no per-query state; one instance behind an `Arc`
/// serves any number of concurrent queries. Construct one via
/// [`QueryPipeline::builder()`].
pub struct QueryPipeline {
    config: PipelineConfig,
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    evaluator: Option<Arc<dyn Evaluator>>,
}

impl QueryPipeline {
    /// Create a new [`QueryPipelineBuilder`].
    pub fn builder() -> QueryPipelineBuilder {
        QueryPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Return a reference to the retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer a validated query.
    ///
    /// `processing_time_ms` covers retrieval, generation and, when
    /// requested, evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::RetrievalFailed`] if the vector index cannot be
    /// queried and [`QueryError::GenerationFailed`] if the generator fails or
    /// exceeds its timeout. No partial result is returned in either case.
    pub async fn answer(&self, query: &Query) -> std::result::Result<QueryResult, QueryError> {
        let start = Instant::now();
        let question = query.question();

        debug!(stage = %QueryStage::Retrieving, top_k = self.config.top_k, "query started");
        let passages =
            self.retriever.retrieve(question, self.config.top_k).await.map_err(|e| {
                error!(stage = %QueryStage::Failed, failed_at = %QueryStage::Retrieving, error = %e, "query failed");
                QueryError::RetrievalFailed(e.to_string())
            })?;

        debug!(stage = %QueryStage::Generating, passages = passages.len(), "passages retrieved");
        let answer = self.generate(question, &passages).await.map_err(|e| {
            error!(stage = %QueryStage::Failed, failed_at = %QueryStage::Generating, error = %e, "query failed");
            QueryError::GenerationFailed(e.to_string())
        })?;

        let evaluation = if query.enable_evaluation() {
            debug!(stage = %QueryStage::Evaluating, "answer generated");
            Some(self.evaluate(question, &answer, &passages).await)
        } else {
            debug!(stage = %QueryStage::Skipped, "answer generated");
            None
        };

        let processing_time_ms = elapsed_ms(start);
        info!(
            stage = %QueryStage::Done,
            passages = passages.len(),
            evaluated = evaluation.is_some(),
            evaluation_degraded = evaluation.as_ref().is_some_and(EvaluationScore::is_degraded),
            processing_time_ms,
            "query completed"
        );

        Ok(QueryResult {
            question: question.to_string(),
            answer,
            sources: query.include_sources().then_some(passages),
            processing_time_ms,
            evaluation,
        })
    }

    /// Call the generator under the configured timeout.
    ///
    /// With no passages there is nothing to ground an answer in, so the
    /// generator is skipped and [`NO_CONTEXT_ANSWER`] is returned.
    async fn generate(&self, question: &str, passages: &[SourcePassage]) -> Result<String> {
        if passages.is_empty() {
            info!("no passages retrieved, returning no-context answer");
            return Ok(NO_CONTEXT_ANSWER.to_string());
        }

        let timeout = self.config.generation_timeout;
        match tokio::time::timeout(timeout, self.generator.generate(question, passages)).await {
            Ok(answer) => answer,
            Err(_) => Err(RagError::GenerationError {
                provider: self.generator.name().to_string(),
                message: format!("timed out after {} ms", timeout.as_millis()),
            }),
        }
    }

    async fn evaluate(
        &self,
        question: &str,
        answer: &str,
        passages: &[SourcePassage],
    ) -> EvaluationScore {
        match &self.evaluator {
            Some(evaluator) => {
                score_with_timeout(
                    evaluator.as_ref(),
                    self.config.evaluation_timeout,
                    question,
                    answer,
                    passages,
                )
                .await
            }
            None => EvaluationScore::failed("no evaluator configured", 0.0),
        }
    }
}

/// Builder for constructing a [`QueryPipeline`].
///
/// All fields except `evaluator` are required. Call
/// [`build()`](QueryPipelineBuilder::build) to validate and produce the
/// pipeline.
#[derive(Default)]
pub struct QueryPipelineBuilder {
    config: Option<PipelineConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    collection: Option<String>,
    generator: Option<Arc<dyn Generator>>,
    evaluator: Option<Arc<dyn Evaluator>>,
}

impl QueryPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider used to embed questions.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the collection searched for passages.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set an optional evaluator for queries that request scoring.
    pub fn evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Build the [`QueryPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing.
    pub fn build(self) -> Result<QueryPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let collection = self
            .collection
            .ok_or_else(|| RagError::ConfigError("collection is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;

        let mut retriever = Retriever::new(embedding_provider, vector_store, collection);
        if let Some(threshold) = config.similarity_threshold {
            retriever = retriever.with_similarity_threshold(threshold);
        }

        Ok(QueryPipeline { config, retriever, generator, evaluator: self.evaluator })
    }
}
