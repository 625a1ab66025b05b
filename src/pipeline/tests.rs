use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;
use crate::config::{Domain, DomainConfig, ModelSpec};
use crate::embedding::{DeviceKind, EngineError, PairScorer, RuntimeSettings};
use crate::registry::{EncoderLoader, EngineLoader, ModelRegistry, RerankerLoader};

fn domain(domain: Domain, models: &[(&str, &str)]) -> DomainConfig {
    DomainConfig {
        domain,
        models: models
            .iter()
            .map(|(name, path)| ModelSpec::new(domain, *name, *path))
            .collect(),
        runtime: RuntimeSettings::new(DeviceKind::Cpu),
    }
}

fn embedding_registry() -> ModelRegistry<EncoderLoader> {
    ModelRegistry::new(
        &domain(
            Domain::Embedding,
            &[("bge-small", "stub:small"), ("bge-large", "stub:large")],
        ),
        EncoderLoader,
    )
}

fn rerank_registry() -> ModelRegistry<RerankerLoader> {
    ModelRegistry::new(
        &domain(Domain::Rerank, &[("ms-marco", "stub")]),
        RerankerLoader,
    )
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Loader whose engines return fixed scores and count constructions.
struct FixedScoreLoader {
    scores: Vec<f32>,
    loads: Arc<AtomicUsize>,
}

struct FixedScorer(Vec<f32>);

impl PairScorer for FixedScorer {
    fn score_pairs(&self, _: &str, _: &[String]) -> Result<Vec<f32>, EngineError> {
        Ok(self.0.clone())
    }
}

impl EngineLoader for FixedScoreLoader {
    type Engine = FixedScorer;

    fn load(&self, _: &ModelSpec, _: &RuntimeSettings) -> Result<FixedScorer, EngineError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(FixedScorer(self.scores.clone()))
    }
}

fn fixed_registry(scores: Vec<f32>) -> (ModelRegistry<FixedScoreLoader>, Arc<AtomicUsize>) {
    let loads = Arc::new(AtomicUsize::new(0));
    let registry = ModelRegistry::new(
        &domain(Domain::Rerank, &[("fixed", "/models/fixed")]),
        FixedScoreLoader {
            scores,
            loads: Arc::clone(&loads),
        },
    );
    (registry, loads)
}

#[test]
fn test_resolve_defaults_to_first_model() {
    let models = vec![
        ModelSpec::new(Domain::Embedding, "a", "stub"),
        ModelSpec::new(Domain::Embedding, "b", "stub"),
    ];

    assert_eq!(resolve_model(None, &models).unwrap().name, "a");
    assert_eq!(resolve_model(Some(""), &models).unwrap().name, "a");
    assert_eq!(resolve_model(Some("b"), &models).unwrap().name, "b");

    let err = resolve_model(Some("c"), &models).unwrap_err();
    assert!(err.to_string().contains("\"a\""));
    assert!(err.to_string().contains("\"b\""));
}

#[test]
fn test_resolve_without_models_is_param_error() {
    let err = resolve_model(None, &[]).unwrap_err();
    assert!(matches!(err, PipelineError::Param { .. }));
}

#[tokio::test]
async fn test_embed_returns_one_vector_per_input_in_order() {
    let registry = embedding_registry();
    let response = embed(
        &registry,
        EmbeddingRequest {
            input: strings(&["hello", "world", "hello"]),
            model: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(response.model, "bge-small");
    assert_eq!(response.object, "list");
    assert_eq!(response.data.len(), 1);

    let dense = &response.data[0].dense;
    assert_eq!(dense.len(), 3);
    assert_eq!(dense[0], dense[2]);
    assert_ne!(dense[0], dense[1]);
}

#[tokio::test]
async fn test_embed_usage_sums_token_counts() {
    let registry = embedding_registry();
    let response = embed(
        &registry,
        EmbeddingRequest {
            input: strings(&["hello", "big wide world"]),
            model: Some("bge-large".to_string()),
        },
    )
    .await
    .unwrap();

    assert_eq!(response.model, "bge-large");
    assert_eq!(response.usage.prompt_tokens, 4);
    assert_eq!(response.usage.total_tokens, response.usage.prompt_tokens);
}

#[tokio::test]
async fn test_embed_rejects_empty_input() {
    let registry = embedding_registry();
    let err = embed(
        &registry,
        EmbeddingRequest {
            input: vec![],
            model: None,
        },
    )
    .await
    .unwrap_err();

    match err {
        PipelineError::Param { errors, .. } => {
            assert_eq!(errors, vec![FieldError::new(["body", "input"], "input empty")]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!registry.is_loaded());
}

#[tokio::test]
async fn test_unknown_model_never_reaches_registry() {
    let (registry, loads) = fixed_registry(vec![1.0]);
    let err = rerank(
        &registry,
        RerankRequest {
            model: Some("nope".to_string()),
            query: "q".to_string(),
            documents: strings(&["a"]),
            top_n: None,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::Param { .. }));
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rerank_rejects_empty_query_or_documents() {
    let registry = rerank_registry();

    for (query, documents) in [("", strings(&["a"])), ("q", vec![])] {
        let err = rerank(
            &registry,
            RerankRequest {
                model: None,
                query: query.to_string(),
                documents,
                top_n: None,
            },
        )
        .await
        .unwrap_err();

        match err {
            PipelineError::Param { errors, .. } => {
                assert_eq!(errors[0].loc, vec!["body", "query/documents"]);
                assert_eq!(errors[0].msg, "query/documents empty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[tokio::test]
async fn test_rerank_ranks_and_truncates() {
    let (registry, _) = fixed_registry(vec![0.5, 2.0, -1.0]);
    let response = rerank(
        &registry,
        RerankRequest {
            model: None,
            query: "q".to_string(),
            documents: strings(&["a", "b", "c"]),
            top_n: Some(2),
        },
    )
    .await
    .unwrap();

    let indices: Vec<usize> = response.results.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![1, 0]);
    assert_eq!(response.results[0].text, "b");
    assert!(response.results[0].relevance_score > response.results[1].relevance_score);
    for r in &response.results {
        assert!((0.0..=1.0).contains(&r.relevance_score));
    }
    assert!(uuid::Uuid::parse_str(&response.id).is_ok());
}

#[tokio::test]
async fn test_rerank_top_n_clamps() {
    let (registry, _) = fixed_registry(vec![0.1, 0.2, 0.3]);
    for (top_n, expected) in [(None, 3), (Some(0), 0), (Some(-4), 0), (Some(7), 3)] {
        let response = rerank(
            &registry,
            RerankRequest {
                model: None,
                query: "q".to_string(),
                documents: strings(&["a", "b", "c"]),
                top_n,
            },
        )
        .await
        .unwrap();
        assert_eq!(response.results.len(), expected, "top_n = {top_n:?}");
    }
}

#[tokio::test]
async fn test_rerank_ids_are_unique() {
    let registry = rerank_registry();
    let request = RerankRequest {
        model: None,
        query: "rust".to_string(),
        documents: strings(&["rust book"]),
        top_n: None,
    };

    let a = rerank(&registry, request.clone()).await.unwrap();
    let b = rerank(&registry, request).await.unwrap();
    assert_ne!(a.id, b.id);
}

#[tokio::test]
async fn test_rerank_score_count_mismatch_is_business_error() {
    let (registry, _) = fixed_registry(vec![1.0]);
    let err = rerank(
        &registry,
        RerankRequest {
            model: None,
            query: "q".to_string(),
            documents: strings(&["a", "b"]),
            top_n: None,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::Business(_)));
}

#[tokio::test]
async fn test_model_init_failure_is_reported_and_retried() {
    let registry = ModelRegistry::new(
        &domain(Domain::Embedding, &[("broken", "/nonexistent/model")]),
        EncoderLoader,
    );
    let request = || EmbeddingRequest {
        input: strings(&["x"]),
        model: None,
    };

    let first = embed(&registry, request()).await.unwrap_err();
    assert!(matches!(first, PipelineError::ModelInit(_)));
    assert!(first.to_string().contains("/nonexistent/model"));

    let second = embed(&registry, request()).await.unwrap_err();
    assert!(matches!(second, PipelineError::ModelInit(_)));
}

#[tokio::test]
async fn test_stub_reranker_prefers_relevant_documents() {
    let registry = rerank_registry();
    let response = rerank(
        &registry,
        RerankRequest {
            model: Some("ms-marco".to_string()),
            query: "binary search tree".to_string(),
            documents: strings(&[
                "A recipe for banana bread.",
                "Balancing a binary search tree after insertion.",
            ]),
            top_n: Some(1),
        },
    )
    .await
    .unwrap();

    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].index, 1);
}
