//! Question → ranked source passages.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::query::SourcePassage;
use crate::vectorstore::VectorStore;

/// Turns a question into a ranked list of [`SourcePassage`]s.
///
/// Every call embeds the question once and issues exactly one search
/// against the [`VectorStore`]. The retriever holds no per-call state and is
/// shared across concurrent queries.
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    similarity_threshold: f32,
}

impl Retriever {
    /// Create a retriever over `collection`.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedding_provider,
            vector_store,
            collection: collection.into(),
            similarity_threshold: f32::NEG_INFINITY,
        }
    }

    /// Drop passages scoring below `threshold`.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// The collection this retriever searches.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Retrieve at most `k` passages, ordered by descending similarity.
    ///
    /// Ties keep the order reported by the index. An empty collection is not
    /// an error and yields an empty `Vec`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if the question cannot be
    /// embedded and [`RagError::IndexUnavailable`] if the search fails.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<SourcePassage>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedding_provider.embed(question).await.map_err(|e| {
            error!(error = %e, "embedding failed during retrieval");
            e
        })?;

        let results = self
            .vector_store
            .search(&self.collection, &embedding, k)
            .await
            .map_err(|e| {
                error!(
                    collection = %self.collection,
                    backend = self.vector_store.backend(),
                    error = %e,
                    "vector index search failed"
                );
                RagError::IndexUnavailable(e.to_string())
            })?;

        if results.is_empty() {
            info!(collection = %self.collection, "vector index returned no passages");
            return Ok(Vec::new());
        }

        let ranked = rank(results, self.similarity_threshold, k);
        debug!(collection = %self.collection, passages = ranked.len(), "retrieved passages");
        Ok(ranked.into_iter().map(SourcePassage::from).collect())
    }
}

/// Drop non-finite scores and those under the threshold, sort by descending
/// score (stable), keep the top `k`.
fn rank(mut results: Vec<SearchResult>, threshold: f32, k: usize) -> Vec<SearchResult> {
    results.retain(|r| r.score.is_finite() && r.score >= threshold);
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(k);
    results
}
