//! `docqa-server` exposes the `docqa-rag` pipeline over HTTP.
//!
//! Routes: `POST /query`, `GET /health`, `GET /ready`, `POST /documents`
//! (multipart upload) and `GET /documents`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod telemetry;

pub use config::{Backend, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use server::{AppState, app_router, run_server};
pub use telemetry::init_telemetry;
