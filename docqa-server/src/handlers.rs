//! Route handlers.

use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
};
use chrono::Utc;
use docqa_rag::{Query, QueryRequest, QueryResult};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::models::{
    CollectionReport, DocumentListResponse, DocumentUploadResponse, HealthResponse,
    ReadinessResponse,
};
use crate::server::AppState;

/// Multipart field carrying the uploaded document.
const FILE_FIELD: &str = "file";

pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<Json<QueryResult>> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected query body");
        ApiError::validation("body", rejection.body_text())
    })?;
    let query = Query::try_from(request)?;
    // A collection missing since startup would fail the search; retry its creation.
    if state.ingestor.ensure_collection().await.is_err() {
        warn!(collection = state.ingestor.collection(), "collection still missing");
    }
    let result = state.pipeline.answer(&query).await?;
    Ok(Json(result))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Always 200; an unreachable index shows up as `degraded`.
pub async fn ready(State(state): State<AppState>) -> Json<ReadinessResponse> {
    match state.ingestor.collection_info().await {
        Ok(info) => Json(ReadinessResponse {
            status: "ready".to_string(),
            index_connected: true,
            collection_info: CollectionReport::Info(info),
        }),
        Err(e) => {
            warn!(collection = state.ingestor.collection(), error = %e, "readiness check failed");
            Json(ReadinessResponse {
                status: "degraded".to_string(),
                index_connected: false,
                collection_info: CollectionReport::Unavailable { error: e.to_string() },
            })
        }
    }
}

pub async fn upload_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<DocumentUploadResponse>> {
    let mut multipart =
        multipart.map_err(|rejection| ApiError::validation(FILE_FIELD, rejection.body_text()))?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::validation(FILE_FIELD, "no filename provided"))?
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|_| ApiError::validation(FILE_FIELD, "file must be UTF-8 text"))?;
        if text.trim().is_empty() {
            return Err(ApiError::validation(FILE_FIELD, "file is empty"));
        }

        let chunks = state
            .ingestor
            .ingest_file(&filename, text)
            .await
            .map_err(|e| ApiError::IngestionFailed(e.to_string()))?;

        info!(filename = %filename, chunks_created = chunks.len(), "document uploaded");
        return Ok(Json(DocumentUploadResponse {
            message: format!("Successfully processed {filename}"),
            filename,
            chunks_created: chunks.len(),
            document_ids: chunks.into_iter().map(|chunk| chunk.id).collect(),
        }));
    }

    Err(ApiError::validation(FILE_FIELD, "multipart field 'file' is required"))
}

pub async fn list_documents(State(state): State<AppState>) -> ApiResult<Json<DocumentListResponse>> {
    let info = state
        .ingestor
        .collection_info()
        .await
        .map_err(|e| ApiError::IndexUnavailable(e.to_string()))?;
    Ok(Json(DocumentListResponse {
        collection_name: info.name,
        total_documents: info.points_count,
        status: info.status,
    }))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::validation(FILE_FIELD, err.body_text())
    }
}
