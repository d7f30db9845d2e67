//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a zero-dependency vector store
//! backed by a `HashMap` protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and small-scale deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, CollectionInfo, SearchResult};
use crate::embedding::cosine_similarity;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// An in-memory vector store using cosine similarity for search.
///
/// Each collection keeps its chunks in insertion order, so search results
/// with equal scores come back in the order the chunks were first stored.
/// Upserting an existing chunk ID replaces it in place.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Vec<Chunk>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing_collection(collection: &str) -> RagError {
    RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn create_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        for chunk in chunks {
            match store.iter_mut().find(|existing| existing.id == chunk.id) {
                Some(existing) => *existing = chunk.clone(),
                None => store.push(chunk.clone()),
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing_collection(collection))?;
        store.retain(|chunk| !ids.contains(&chunk.id.as_str()));
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;

        let mut scored: Vec<SearchResult> = store
            .iter()
            .filter_map(|chunk| {
                let score = cosine_similarity(&chunk.embedding, embedding);
                score.is_finite().then(|| SearchResult { chunk: chunk.clone(), score })
            })
            .collect();

        // sort_by is stable: equal scores keep insertion order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing_collection(collection))?;
        Ok(CollectionInfo {
            name: collection.to_string(),
            points_count: store.len() as u64,
            status: "green".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: format!("text of {id}"),
            embedding,
            metadata: HashMap::new(),
            document_id: "doc".to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_replaces_existing_chunk_in_place() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store.upsert("c", &[chunk("a", vec![1.0, 0.0]), chunk("b", vec![1.0, 0.0])]).await.unwrap();
        store.upsert("c", &[chunk("a", vec![1.0, 0.0])]).await.unwrap();

        let info = store.collection_info("c").await.unwrap();
        assert_eq!(info.points_count, 2);

        let results = store.search("c", &[1.0, 0.0], 10).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn non_finite_embeddings_are_skipped() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store
            .upsert(
                "c",
                &[
                    chunk("nan", vec![f32::NAN, 1.0]),
                    chunk("a", vec![1.0, 0.0]),
                    chunk("inf", vec![f32::INFINITY, 0.0]),
                    chunk("b", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let results = store.search("c", &[1.0, 0.0], 10).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn delete_removes_chunks() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        store.upsert("c", &[chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])]).await.unwrap();
        store.delete("c", &["a"]).await.unwrap();

        let results = store.search("c", &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "b");
    }

    #[tokio::test]
    async fn missing_collection_is_an_error() {
        let store = InMemoryVectorStore::new();
        let err = store.search("nope", &[1.0], 3).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }));
        assert!(store.collection_info("nope").await.is_err());
    }

    #[tokio::test]
    async fn empty_collection_searches_to_nothing() {
        let store = InMemoryVectorStore::new();
        store.create_collection("c", 2).await.unwrap();
        assert!(store.search("c", &[1.0, 0.0], 4).await.unwrap().is_empty());
        assert_eq!(store.collection_info("c").await.unwrap().points_count, 0);
    }
}
