use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::embedding::{PairScorer, TextEmbedder};
use crate::pipeline::{self, EmbeddingRequest, EmbeddingResponse, RerankRequest, RerankResponse};
use crate::registry::EngineLoader;

use super::envelope::{Envelope, ResponseCode};
use super::error::ApiError;
use super::state::AppState;

#[tracing::instrument(skip_all)]
pub async fn embeddings_handler<E, R>(
    State(state): State<AppState<E, R>>,
    payload: Result<Json<EmbeddingRequest>, JsonRejection>,
) -> Result<Envelope<EmbeddingResponse>, ApiError>
where
    E: EngineLoader,
    E::Engine: TextEmbedder,
    R: EngineLoader,
{
    let Json(request) = payload?;
    let response = pipeline::embed(state.embedding.as_ref(), request).await?;
    Ok(Envelope::success(response))
}

#[tracing::instrument(skip_all)]
pub async fn rerank_handler<E, R>(
    State(state): State<AppState<E, R>>,
    payload: Result<Json<RerankRequest>, JsonRejection>,
) -> Result<Envelope<RerankResponse>, ApiError>
where
    E: EngineLoader,
    R: EngineLoader,
    R::Engine: PairScorer,
{
    let Json(request) = payload?;
    let response = pipeline::rerank(state.rerank.as_ref(), request).await?;
    Ok(Envelope::success(response))
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

#[tracing::instrument]
pub async fn health_handler() -> Envelope<HealthStatus> {
    Envelope::success(HealthStatus { status: "ok" })
}

#[derive(Debug, Serialize)]
pub struct ReadyStatus {
    pub status: &'static str,
    pub domains: DomainStatus,
}

#[derive(Debug, Serialize)]
pub struct DomainStatus {
    pub embedding: DomainReadiness,
    pub rerank: DomainReadiness,
}

#[derive(Debug, Serialize)]
pub struct DomainReadiness {
    pub loaded: bool,
    pub models: Vec<String>,
}

/// Reports whether both domains are built. Never triggers a build.
#[tracing::instrument(skip_all)]
pub async fn ready_handler<E, R>(State(state): State<AppState<E, R>>) -> Response
where
    E: EngineLoader,
    R: EngineLoader,
{
    let domains = DomainStatus {
        embedding: DomainReadiness {
            loaded: state.embedding.is_loaded(),
            models: owned(state.embedding.model_names()),
        },
        rerank: DomainReadiness {
            loaded: state.rerank.is_loaded(),
            models: owned(state.rerank.model_names()),
        },
    };

    let ready = domains.embedding.loaded && domains.rerank.loaded;
    let status = if ready { "ok" } else { "pending" };
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Envelope::with_status(
        code,
        if ready {
            ResponseCode::Success.message()
        } else {
            "models not loaded"
        },
        Some(ReadyStatus { status, domains }),
    )
    .into_response()
}

pub async fn not_found_handler() -> ApiError {
    ApiError::transport(StatusCode::NOT_FOUND)
}

pub async fn method_not_allowed_handler(method: Method) -> ApiError {
    tracing::debug!(method = %method, "Method not allowed");
    ApiError::transport(StatusCode::METHOD_NOT_ALLOWED)
}

fn owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(str::to_string).collect()
}
