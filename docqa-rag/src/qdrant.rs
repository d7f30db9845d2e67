//! Qdrant vector store backend.
//!
//! Each chunk becomes one point whose ID is the chunk ID (a UUID, as assigned
//! by the [`Ingestor`](crate::Ingestor)) and whose payload holds `text`,
//! `document_id` and a `metadata` object. Collections use cosine distance,
//! so point scores are cosine similarities.
//!
//! The gRPC client multiplexes requests over one channel; a single store is
//! shared by all concurrent queries.
//!
//! ```rust,ignore
//! use docqa_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334", None)?;
//! store.create_collection("docs", 1536).await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CollectionStatus, CreateCollectionBuilder, DeletePointsBuilder, Distance, PointId,
    PointStruct, PointsIdsList, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use serde_json::json;
use tracing::debug;

use crate::document::{Chunk, CollectionInfo, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "qdrant";

/// Default gRPC endpoint of a local Qdrant.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Connect to `url`. `api_key` is only needed for secured deployments.
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder.build().map_err(backend_error)?;
        Ok(Self { client })
    }

    /// Connect to [`DEFAULT_QDRANT_URL`].
    pub fn default_url() -> Result<Self> {
        Self::new(DEFAULT_QDRANT_URL, None)
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }
}

fn backend_error(e: QdrantError) -> RagError {
    RagError::VectorStoreError { backend: BACKEND.to_string(), message: e.to_string() }
}

fn to_point(chunk: &Chunk) -> Result<PointStruct> {
    let payload = Payload::try_from(json!({
        "text": chunk.text,
        "document_id": chunk.document_id,
        "metadata": chunk.metadata,
    }))
    .map_err(backend_error)?;
    Ok(PointStruct::new(chunk.id.clone(), chunk.embedding.clone(), payload))
}

fn as_string(value: &QdrantValue) -> Option<String> {
    match &value.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    }
}

fn point_id(id: Option<&PointId>) -> String {
    match id.and_then(|pid| pid.point_id_options.as_ref()) {
        Some(PointIdOptions::Uuid(uuid)) => uuid.clone(),
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

fn to_search_result(point: ScoredPoint) -> SearchResult {
    let field = |name: &str| point.payload.get(name).and_then(as_string).unwrap_or_default();

    let metadata: HashMap<String, String> = match point.payload.get("metadata").map(|v| &v.kind) {
        Some(Some(Kind::StructValue(fields))) => fields
            .fields
            .iter()
            .filter_map(|(key, value)| as_string(value).map(|s| (key.clone(), s)))
            .collect(),
        _ => HashMap::new(),
    };

    SearchResult {
        chunk: Chunk {
            id: point_id(point.id.as_ref()),
            text: field("text"),
            embedding: Vec::new(),
            metadata,
            document_id: field("document_id"),
        },
        score: point.score,
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    /// Creating an existing collection is a no-op.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let existing = self.client.list_collections().await.map_err(backend_error)?;
        if existing.collections.iter().any(|c| c.name == name) {
            debug!(collection = name, "qdrant collection exists");
            return Ok(());
        }

        let vectors = VectorParamsBuilder::new(dimensions as u64, Distance::Cosine);
        self.client
            .create_collection(CreateCollectionBuilder::new(name).vectors_config(vectors))
            .await
            .map_err(backend_error)?;
        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.client.delete_collection(name).await.map_err(backend_error)?;
        debug!(collection = name, "deleted qdrant collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let points = chunks.iter().map(to_point).collect::<Result<Vec<_>>>()?;
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(backend_error)?;
        debug!(collection, count = chunks.len(), "upserted qdrant points");
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let ids: Vec<PointId> = ids.iter().map(|&id| id.into()).collect();
        let count = ids.len();
        self.client
            .delete_points(DeletePointsBuilder::new(collection).points(PointsIdsList { ids }).wait(true))
            .await
            .map_err(backend_error)?;
        debug!(collection, count, "deleted qdrant points");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let request =
            SearchPointsBuilder::new(collection, embedding.to_vec(), top_k as u64).with_payload(true);
        let response = self.client.search_points(request).await.map_err(backend_error)?;
        Ok(response.result.into_iter().map(to_search_result).collect())
    }

    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo> {
        let response = self.client.collection_info(collection).await.map_err(backend_error)?;
        let info = response.result.ok_or_else(|| RagError::VectorStoreError {
            backend: BACKEND.to_string(),
            message: format!("no info returned for collection '{collection}'"),
        })?;

        let status = CollectionStatus::try_from(info.status)
            .map(|s| s.as_str_name().to_lowercase())
            .unwrap_or_else(|_| "unknown".to_string());

        Ok(CollectionInfo {
            name: collection.to_string(),
            points_count: info.points_count.unwrap_or_default(),
            status,
        })
    }
}
