//! Configuration for the query pipeline and document ingestion.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the [`QueryPipeline`](crate::QueryPipeline).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Number of passages retrieved per question.
    pub top_k: usize,
    /// Minimum similarity score for retrieved passages (lower scores are dropped).
    pub similarity_threshold: Option<f32>,
    /// Upper bound on a single generation call.
    pub generation_timeout: Duration,
    /// Upper bound on a single evaluation call.
    pub evaluation_timeout: Duration,
    /// Overall budget of one request, enforced by the HTTP boundary.
    pub request_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            similarity_threshold: None,
            generation_timeout: Duration::from_secs(60),
            evaluation_timeout: Duration::from_secs(20),
            request_timeout: Duration::from_secs(90),
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for constructing a [`PipelineConfig`].
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`PipelineConfig`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the number of passages retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for retrieved passages.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set the timeout applied to each generation call.
    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.config.generation_timeout = timeout;
        self
    }

    /// Set the timeout applied to each evaluation call.
    pub fn evaluation_timeout(mut self, timeout: Duration) -> Self {
        self.config.evaluation_timeout = timeout;
        self
    }

    /// Set the overall request budget.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build the [`PipelineConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `top_k == 0`
    /// - any timeout is zero
    /// - `generation_timeout + evaluation_timeout >= request_timeout`
    ///
    /// Evaluation starts only after generation finishes, so the two budgets
    /// must fit inside the request budget together.
    pub fn build(self) -> Result<PipelineConfig> {
        let c = &self.config;
        if c.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if c.generation_timeout.is_zero()
            || c.evaluation_timeout.is_zero()
            || c.request_timeout.is_zero()
        {
            return Err(RagError::ConfigError("timeouts must be greater than zero".to_string()));
        }
        if c.generation_timeout + c.evaluation_timeout >= c.request_timeout {
            return Err(RagError::ConfigError(format!(
                "generation_timeout ({:?}) plus evaluation_timeout ({:?}) must be shorter than \
                 request_timeout ({:?})",
                c.generation_timeout, c.evaluation_timeout, c.request_timeout
            )));
        }
        Ok(self.config)
    }
}

/// Chunking parameters used by the [`Ingestor`](crate::Ingestor).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200 }
    }
}

impl ChunkingConfig {
    /// Create a validated chunking configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size == 0` or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }
}
