//! Document ingestion: chunk → embed → store.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info};
use uuid::Uuid;

use crate::chunking::chunker_for;
use crate::config::ChunkingConfig;
use crate::document::{Chunk, CollectionInfo, Document};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Feeds documents into one vector store collection.
///
/// Chunk IDs are replaced with fresh UUIDs before storage so that they are
/// valid point IDs for every backend.
pub struct Ingestor {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    chunking: ChunkingConfig,
    /// Set once the collection has been created; failed attempts leave it
    /// empty so the next call retries.
    collection_ready: OnceCell<()>,
}

impl Ingestor {
    /// Create an ingestor writing into `collection`.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            embedding_provider,
            vector_store,
            collection: collection.into(),
            chunking,
            collection_ready: OnceCell::new(),
        }
    }

    /// The target collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection if it does not exist yet.
    ///
    /// The collection is created with the dimensionality reported by the
    /// configured [`EmbeddingProvider`]. After the first success this is a
    /// no-op; after a failure the next call tries again, so a store that was
    /// down at startup gets its collection once it comes back.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestionError`] if the vector store operation fails.
    pub async fn ensure_collection(&self) -> Result<()> {
        self.collection_ready
            .get_or_try_init(|| async {
                let dimensions = self.embedding_provider.dimensions();
                self.vector_store.create_collection(&self.collection, dimensions).await.map_err(
                    |e| {
                        error!(collection = %self.collection, error = %e, "failed to create collection");
                        RagError::IngestionError(format!(
                            "failed to create collection '{}': {e}",
                            self.collection
                        ))
                    },
                )
            })
            .await
            .map(|_| ())
    }

    /// Statistics of the target collection.
    pub async fn collection_info(&self) -> Result<CollectionInfo> {
        self.vector_store.collection_info(&self.collection).await
    }

    /// Ingest an uploaded file's text under a fresh document ID.
    pub async fn ingest_file(&self, filename: &str, text: String) -> Result<Vec<Chunk>> {
        self.ingest(&Document::from_upload(filename, text)).await
    }

    /// Ingest a single document: ensure collection → chunk → embed → store.
    ///
    /// The chunker is picked from the document's `source` metadata (falling
    /// back to its ID): Markdown files split on headers, everything else
    /// recursively. Returns the stored chunks, embeddings attached.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestionError`] if embedding or storage fails,
    /// including the document ID in the error message.
    pub async fn ingest(&self, document: &Document) -> Result<Vec<Chunk>> {
        self.ensure_collection().await?;
        let name = document.source();
        let chunker = chunker_for(name, self.chunking);

        let mut chunks = chunker.chunk(document);
        if chunks.is_empty() {
            info!(document.id = %document.id, chunk_count = 0, "ingested document (empty)");
            return Ok(chunks);
        }
        for chunk in &mut chunks {
            chunk.id = Uuid::new_v4().to_string();
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
            RagError::IngestionError(format!(
                "embedding failed for document '{}': {e}",
                document.id
            ))
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::IngestionError(format!(
                "embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        self.vector_store.upsert(&self.collection, &chunks).await.map_err(|e| {
            error!(document.id = %document.id, error = %e, "upsert failed during ingestion");
            RagError::IngestionError(format!("upsert failed for document '{}': {e}", document.id))
        })?;

        info!(document.id = %document.id, source = %name, chunk_count = chunks.len(), "ingested document");
        Ok(chunks)
    }
}
