use super::*;
use crate::config::Domain;
use crate::embedding::DeviceKind;

fn spec(path: &str) -> ModelSpec {
    ModelSpec::new(Domain::Rerank, "test-reranker", path)
}

#[test]
fn test_stub_identifier_loads_stub() {
    let reranker = Reranker::load(&spec("stub"), &RuntimeSettings::new(DeviceKind::Cpu)).unwrap();
    assert!(reranker.is_stub());
}

#[test]
fn test_labelled_stub_identifier_loads_stub() {
    let reranker =
        Reranker::load(&spec("stub:ms-marco"), &RuntimeSettings::new(DeviceKind::Cpu)).unwrap();
    assert!(reranker.is_stub());
}

#[test]
fn test_load_with_missing_directory() {
    let result = Reranker::load(
        &spec("/nonexistent/path/reranker"),
        &RuntimeSettings::new(DeviceKind::Cpu),
    );

    assert!(matches!(
        result.unwrap_err(),
        EngineError::ModelNotFound { .. }
    ));
}

#[test]
fn test_load_with_incomplete_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.json"), "{}").unwrap();

    let result = Reranker::load(
        &spec(dir.path().to_str().unwrap()),
        &RuntimeSettings::new(DeviceKind::Cpu),
    );

    match result.unwrap_err() {
        EngineError::ModelLoadFailed { reason } => {
            assert!(reason.contains("model.safetensors"), "got: {reason}")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_stub_prefers_overlapping_documents() {
    let reranker = Reranker::stub();
    let scores = reranker
        .score_pairs(
            "binary tree in rust",
            &[
                "The weather in Paris is nice today.".to_string(),
                "Implementing a binary tree in Rust with insert and traversal.".to_string(),
            ],
        )
        .unwrap();

    assert_eq!(scores.len(), 2);
    assert!(scores[1] > scores[0]);
}

#[test]
fn test_stub_scores_are_deterministic() {
    let reranker = Reranker::stub();
    let first = reranker.score("query words", "some query document").unwrap();
    let second = reranker.score("query words", "some query document").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_stub_logit_is_signed() {
    let reranker = Reranker::stub();
    let exact = reranker.score("rust tree", "rust tree").unwrap();
    let disjoint = reranker.score("rust tree", "weather paris").unwrap();

    assert!(exact > 0.0);
    assert!(disjoint < 0.0);
}

#[test]
fn test_stub_handles_stop_word_only_query() {
    let reranker = Reranker::stub();
    let score = reranker.score("the and of", "anything at all").unwrap();
    assert!(score < 0.0);
}

#[test]
fn test_content_words_drop_stop_words_and_punctuation() {
    let lowered = "what is the tokio runtime, and how does it schedule?".to_lowercase();
    let mut words: Vec<&str> = content_words(&lowered).into_iter().collect();
    words.sort_unstable();
    assert_eq!(words, vec!["runtime", "schedule", "tokio"]);
}

#[test]
fn test_stop_words_ignored_regardless_of_case() {
    let reranker = Reranker::stub();
    let plain = reranker.score("tokio runtime", "tokio runtime").unwrap();
    let padded = reranker
        .score("The Tokio runtime", "THE tokio RUNTIME of it")
        .unwrap();
    assert_eq!(plain, padded);
}
