//! vecrank library crate (used by the server binary and integration tests).
//!
//! An inference gateway serving text embeddings and cross-encoder reranking
//! over HTTP.
//!
//! ## Modules
//! - [`config`]: TOML + environment configuration ([`Config`]).
//! - [`embedding`]: candle-backed engines ([`Encoder`], [`Reranker`]) and the
//!   deterministic stub backend.
//! - [`registry`]: per-domain lazy, single-flight engine cache
//!   ([`ModelRegistry`]).
//! - [`pipeline`]: the embedding and rerank request pipelines, plus score
//!   normalisation and ranking.
//! - [`auth`]: fail-closed bearer-token gate.
//! - [`gateway`]: axum router, response envelope and error mapping.
//! - [`telemetry`]: tracing subscriber with a bounded non-blocking writer.

pub mod auth;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod gateway;
pub mod pipeline;
pub mod registry;
pub mod telemetry;

pub use auth::{AuthPolicy, AuthRejection};
pub use config::{Config, ConfigError, Domain, DomainConfig, ModelSpec};
pub use embedding::{
    DeviceKind, Encoder, EngineError, PairScorer, Reranker, RuntimeSettings, TextEmbedder,
};
pub use gateway::{ApiError, AppState, Envelope, ServiceState, create_router};
pub use pipeline::{
    EmbeddingRequest, EmbeddingResponse, FieldError, PipelineError, RankedDocument,
    RerankRequest, RerankResponse,
};
pub use registry::{EncoderLoader, EngineLoader, ModelRegistry, RegistryError, RerankerLoader};
pub use telemetry::TelemetryError;
