//! HTTP gateway (Axum) for the embedding and rerank endpoints.
//!
//! Layers, outermost first: CORS, request tracing, body limit, failure
//! logging, panic recovery, bearer auth. Auth therefore also covers the
//! health routes and the 404/405 fallbacks, and every failure (including an
//! auth rejection or a panic) is logged exactly once.

pub mod envelope;
pub mod error;
pub mod handler;
pub mod state;


use std::any::Any;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use envelope::{Envelope, FailureReport, ResponseCode};
pub use error::ApiError;
pub use handler::{embeddings_handler, health_handler, ready_handler, rerank_handler};
pub use state::{AppState, ServiceState};

use crate::auth::require_bearer;
use crate::constants::{CORS_MAX_AGE_SECS, MAX_REQUEST_BODY_BYTES};
use crate::embedding::{PairScorer, TextEmbedder};
use crate::registry::EngineLoader;

pub fn create_router<E, R>(state: AppState<E, R>) -> Router
where
    E: EngineLoader,
    E::Engine: TextEmbedder,
    R: EngineLoader,
    R::Engine: PairScorer,
{
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin)
        .max_age(Duration::from_secs(CORS_MAX_AGE_SECS));

    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler::<E, R>))
        .route("/v1/embeddings", post(embeddings_handler::<E, R>))
        .route("/v1/rerank", post(rerank_handler::<E, R>))
        .fallback(handler::not_found_handler)
        .method_not_allowed_fallback(handler::method_not_allowed_handler)
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            require_bearer,
        ))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn(envelope::log_failures))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError::Business(format!("handler panicked: {detail}")).into_response()
}
