use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::embedding::PairScorer;
use crate::registry::{EngineLoader, ModelRegistry};

use super::ranking::{effective_count, rank};
use super::{FieldError, PipelineError, resolve_model, run_blocking};

#[derive(Debug, Clone, Deserialize)]
pub struct RerankRequest {
    #[serde(default)]
    pub model: Option<String>,
    pub query: String,
    pub documents: Vec<String>,
    #[serde(default)]
    pub top_n: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedDocument {
    /// Position in the request's `documents`.
    pub index: usize,
    pub relevance_score: f64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RerankResponse {
    pub id: String,
    pub results: Vec<RankedDocument>,
}

/// Scores, ranks and truncates the documents against the query.
pub async fn rerank<L>(
    registry: &ModelRegistry<L>,
    request: RerankRequest,
) -> Result<RerankResponse, PipelineError>
where
    L: EngineLoader,
    L::Engine: PairScorer,
{
    let model = resolve_model(request.model.as_deref(), registry.models())?
        .name
        .clone();

    if request.query.is_empty() || request.documents.is_empty() {
        return Err(PipelineError::field(FieldError::new(
            ["body", "query/documents"],
            "query/documents empty",
        )));
    }

    let engine = registry.engine(&model).await?;
    let query = request.query;
    let documents = Arc::new(request.documents);

    let scores = {
        let documents = Arc::clone(&documents);
        run_blocking(move || engine.score_pairs(&query, &documents)).await?
    };

    if scores.len() != documents.len() {
        return Err(PipelineError::Business(format!(
            "model '{}' returned {} scores for {} documents",
            model,
            scores.len(),
            documents.len()
        )));
    }

    let count = effective_count(request.top_n, documents.len());
    let results = rank(&scores, count)
        .into_iter()
        .map(|r| RankedDocument {
            index: r.index,
            relevance_score: r.relevance,
            text: documents[r.index].clone(),
        })
        .collect::<Vec<_>>();

    debug!(
        model = %model,
        documents = documents.len(),
        returned = results.len(),
        "Rerank computed"
    );

    Ok(RerankResponse {
        id: Uuid::new_v4().to_string(),
        results,
    })
}
