//! Request pipelines.
//!
//! Each pipeline is an async function over a [`ModelRegistry`] that returns an
//! explicit [`PipelineError`]; the HTTP layer maps the error kinds onto the
//! response envelope.
//!
//! [`ModelRegistry`]: crate::registry::ModelRegistry

pub mod embedding;
pub mod ranking;
pub mod rerank;
mod resolve;

#[cfg(test)]
mod tests;

pub use embedding::{DenseBatch, EmbeddingRequest, EmbeddingResponse, Usage, embed};
pub use rerank::{RankedDocument, RerankRequest, RerankResponse, rerank};
pub use resolve::resolve_model;

use serde::Serialize;
use thiserror::Error;

use crate::embedding::EngineError;
use crate::gateway::ResponseCode;
use crate::registry::RegistryError;

/// Field-level validation descriptor returned in `data.errors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
}

impl FieldError {
    pub fn new<I, S>(loc: I, msg: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            loc: loc.into_iter().map(Into::into).collect(),
            msg: msg.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed request or unconfigured model; never reaches the registry.
    #[error("{message}")]
    Param {
        message: String,
        errors: Vec<FieldError>,
    },

    /// Engine construction failed; the text is returned to the client.
    #[error(transparent)]
    ModelInit(RegistryError),

    /// Any other failure; the text is logged only.
    #[error("{0}")]
    Business(String),
}

impl PipelineError {
    pub fn param(message: impl Into<String>) -> Self {
        PipelineError::Param {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// A single invalid field, reported under the generic validation message.
    pub fn field(error: FieldError) -> Self {
        PipelineError::Param {
            message: ResponseCode::ParamFail.message().to_string(),
            errors: vec![error],
        }
    }
}

impl From<RegistryError> for PipelineError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::ModelInit { .. } => PipelineError::ModelInit(e),
            other => PipelineError::Business(other.to_string()),
        }
    }
}

impl From<EngineError> for PipelineError {
    fn from(e: EngineError) -> Self {
        PipelineError::Business(e.to_string())
    }
}

/// Runs blocking inference on the blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, PipelineError>
where
    F: FnOnce() -> Result<T, EngineError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PipelineError::Business(format!("inference task aborted: {e}")))?
        .map_err(PipelineError::from)
}
