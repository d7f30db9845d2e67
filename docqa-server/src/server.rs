use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use docqa_rag::openai::{OpenAIEmbeddingProvider, OpenAIGenerator};
use docqa_rag::qdrant::QdrantVectorStore;
use docqa_rag::{
    EmbeddingEvaluator, EmbeddingProvider, InMemoryVectorStore, Ingestor, QueryPipeline,
    VectorStore,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::config::{Backend, ServerConfig};
use crate::handlers;

/// Shared handler state. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<QueryPipeline>,
    pub ingestor: Arc<Ingestor>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: QueryPipeline, ingestor: Ingestor, max_upload_bytes: usize) -> Self {
        Self { pipeline: Arc::new(pipeline), ingestor: Arc::new(ingestor), max_upload_bytes }
    }

    /// Wire up providers and the vector store from `config`.
    ///
    /// A collection that cannot be created yet is logged, not fatal: the
    /// server starts, `/ready` reports `degraded`, and creation is retried on
    /// the next query or upload.
    pub async fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .context("OPENAI_API_KEY (or --openai-api-key) must be set")?;
        let http = reqwest::Client::new();

        let mut embedder = OpenAIEmbeddingProvider::new(api_key.clone())?
            .with_model(&config.embedding_model)
            .with_base_url(&config.openai_base_url)
            .with_client(http.clone());
        if let Some(dimensions) = config.embedding_dimensions {
            embedder = embedder.with_dimensions(dimensions);
        }
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(embedder);

        let generator = OpenAIGenerator::new(api_key)?
            .with_model(&config.chat_model)
            .with_base_url(&config.openai_base_url)
            .with_client(http);

        let store: Arc<dyn VectorStore> = match config.backend {
            Backend::Memory => Arc::new(InMemoryVectorStore::new()),
            Backend::Qdrant => Arc::new(QdrantVectorStore::new(
                &config.qdrant_url,
                config.qdrant_api_key.clone(),
            )?),
        };

        let pipeline = QueryPipeline::builder()
            .config(config.pipeline_config()?)
            .embedding_provider(Arc::clone(&embedder))
            .vector_store(Arc::clone(&store))
            .collection(&config.collection)
            .generator(Arc::new(generator))
            .evaluator(Arc::new(EmbeddingEvaluator::new(Arc::clone(&embedder))))
            .build()?;

        let ingestor =
            Ingestor::new(embedder, store, &config.collection, config.chunking_config()?);
        if let Err(e) = ingestor.ensure_collection().await {
            warn!(collection = %config.collection, error = %e, "collection not ready at startup");
        }

        Ok(Self::new(pipeline, ingestor, config.max_upload_bytes))
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let request_timeout = state.pipeline.config().request_timeout;
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .route("/query", post(handlers::query))
        .route("/documents", post(handlers::upload_document).get(handlers::list_documents))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.addr()?;
    let state = AppState::from_config(&config).await?;
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        backend = ?config.backend,
        collection = %config.collection,
        "docqa listening on http://{}",
        addr
    );
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("docqa stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM. In-flight handlers are dropped with the connection.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
