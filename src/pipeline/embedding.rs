use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::TextEmbedder;
use crate::registry::{EngineLoader, ModelRegistry};

use super::{FieldError, PipelineError, resolve_model, run_blocking};

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingRequest {
    pub input: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// All vectors of one request, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct DenseBatch {
    pub dense: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub total_tokens: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingResponse {
    pub data: Vec<DenseBatch>,
    pub model: String,
    pub object: &'static str,
    pub usage: Usage,
}

/// Encodes every input with the resolved model and reports token usage.
pub async fn embed<L>(
    registry: &ModelRegistry<L>,
    request: EmbeddingRequest,
) -> Result<EmbeddingResponse, PipelineError>
where
    L: EngineLoader,
    L::Engine: TextEmbedder,
{
    let model = resolve_model(request.model.as_deref(), registry.models())?
        .name
        .clone();

    if request.input.is_empty() {
        return Err(PipelineError::field(FieldError::new(
            ["body", "input"],
            "input empty",
        )));
    }

    let engine = registry.engine(&model).await?;
    let texts = Arc::new(request.input);

    let dense = {
        let engine = Arc::clone(&engine);
        let texts = Arc::clone(&texts);
        run_blocking(move || engine.encode(&texts)).await?
    };
    let counts = run_blocking(move || engine.token_counts(&texts)).await?;
    let tokens: usize = counts.iter().sum();

    debug!(model = %model, inputs = dense.len(), tokens, "Embedding computed");

    Ok(EmbeddingResponse {
        data: vec![DenseBatch { dense }],
        model,
        object: "list",
        usage: Usage {
            prompt_tokens: tokens,
            total_tokens: tokens,
        },
    })
}
