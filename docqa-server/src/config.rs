//! Command-line and environment configuration of the `docqa` binary.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use docqa_rag::openai::OPENAI_BASE_URL;
use docqa_rag::qdrant::DEFAULT_QDRANT_URL;
use docqa_rag::{ChunkingConfig, PipelineConfig};

/// Where chunks and their embeddings live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Process-local store; contents are lost on restart.
    Memory,
    /// A Qdrant server reached over gRPC.
    Qdrant,
}

/// Server settings. Every flag can also be set through its environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "docqa", version, about = "Question answering over your documents")]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, env = "DOCQA_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind.
    #[arg(long, env = "DOCQA_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Collection holding the indexed documents.
    #[arg(long, env = "DOCQA_COLLECTION", default_value = "documents")]
    pub collection: String,

    /// Vector store backend.
    #[arg(long, env = "DOCQA_BACKEND", value_enum, default_value_t = Backend::Memory)]
    pub backend: Backend,

    #[arg(long, env = "DOCQA_QDRANT_URL", default_value = DEFAULT_QDRANT_URL)]
    pub qdrant_url: String,

    #[arg(long, env = "DOCQA_QDRANT_API_KEY", hide_env_values = true)]
    pub qdrant_api_key: Option<String>,

    /// API key for the embedding and chat endpoints.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API.
    #[arg(long, env = "DOCQA_OPENAI_BASE_URL", default_value = OPENAI_BASE_URL)]
    pub openai_base_url: String,

    #[arg(long, env = "DOCQA_CHAT_MODEL", default_value = "gpt-4o-mini")]
    pub chat_model: String,

    #[arg(long, env = "DOCQA_EMBEDDING_MODEL", default_value = "text-embedding-3-small")]
    pub embedding_model: String,

    /// Request truncated embeddings of this size.
    #[arg(long, env = "DOCQA_EMBEDDING_DIMENSIONS")]
    pub embedding_dimensions: Option<usize>,

    /// Passages retrieved per question.
    #[arg(long, env = "DOCQA_TOP_K", default_value_t = 4)]
    pub top_k: usize,

    /// Drop passages scoring below this similarity.
    #[arg(long, env = "DOCQA_SIMILARITY_THRESHOLD")]
    pub similarity_threshold: Option<f32>,

    #[arg(long, env = "DOCQA_GENERATION_TIMEOUT_SECS", default_value_t = 60)]
    pub generation_timeout_secs: u64,

    #[arg(long, env = "DOCQA_EVALUATION_TIMEOUT_SECS", default_value_t = 20)]
    pub evaluation_timeout_secs: u64,

    /// Budget of a whole HTTP request; slower requests get 408.
    #[arg(long, env = "DOCQA_REQUEST_TIMEOUT_SECS", default_value_t = 90)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "DOCQA_CHUNK_SIZE", default_value_t = 1000)]
    pub chunk_size: usize,

    #[arg(long, env = "DOCQA_CHUNK_OVERLAP", default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Largest accepted request body, in bytes.
    #[arg(long, env = "DOCQA_MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    /// Emit logs as JSON lines.
    #[arg(long, env = "DOCQA_JSON_LOGS")]
    pub json_logs: bool,
}

impl ServerConfig {
    /// The socket address to listen on.
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid host/port {}:{}", self.host, self.port))
    }

    /// Validated pipeline settings.
    pub fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut builder = PipelineConfig::builder()
            .top_k(self.top_k)
            .generation_timeout(Duration::from_secs(self.generation_timeout_secs))
            .evaluation_timeout(Duration::from_secs(self.evaluation_timeout_secs))
            .request_timeout(Duration::from_secs(self.request_timeout_secs));
        if let Some(threshold) = self.similarity_threshold {
            builder = builder.similarity_threshold(threshold);
        }
        Ok(builder.build()?)
    }

    /// Validated chunking settings.
    pub fn chunking_config(&self) -> anyhow::Result<ChunkingConfig> {
        Ok(ChunkingConfig::new(self.chunk_size, self.chunk_overlap)?)
    }
}
