//! Cross-encoder reranker engine (rerank domain).

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::sync::LazyLock;

use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::config::ModelSpec;
use crate::constants::DEFAULT_MAX_SEQ_LEN;

use super::PairScorer;
use super::bert::CrossEncoder;
use super::device::{RuntimeSettings, select_device};
use super::error::EngineError;
use super::utils::{EngineSource, ModelFiles, load_tokenizer};

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as", "into", "and", "but",
    "if", "or", "what", "which", "who", "this", "that", "these", "those", "it", "its", "how",
];

static STOP_WORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// Alphanumeric words of already-lowercased text, minus stop words.
fn content_words(lowered: &str) -> HashSet<&str> {
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !STOP_WORD_SET.contains(w))
        .collect()
}

enum RerankerBackend {
    Model {
        model: CrossEncoder,
        tokenizer: Tokenizer,
        device: Device,
    },
    Stub,
}

/// A loaded cross-encoder.
pub struct Reranker {
    backend: RerankerBackend,
}

impl std::fmt::Debug for Reranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reranker")
            .field(
                "backend",
                &match &self.backend {
                    RerankerBackend::Model { device, .. } => format!("Model({:?})", device),
                    RerankerBackend::Stub => "Stub".to_string(),
                },
            )
            .finish()
    }
}

impl Reranker {
    /// Constructs the cross-encoder named by `spec` on the configured device.
    pub fn load(spec: &ModelSpec, settings: &RuntimeSettings) -> Result<Self, EngineError> {
        let dir = match EngineSource::parse(&spec.path) {
            EngineSource::Stub { .. } => {
                warn!(model = %spec.name, "Reranker running in STUB mode");
                return Ok(Self::stub());
            }
            EngineSource::Directory(dir) => dir,
        };

        let files = ModelFiles::locate(&dir)?;
        let device = select_device(settings.device)?;

        info!(
            model = %spec.name,
            path = %dir.display(),
            fp16 = settings.use_fp16,
            "Loading reranker model"
        );

        let model = CrossEncoder::load(&files, settings.dtype(), &device).map_err(|e| {
            EngineError::ModelLoadFailed {
                reason: format!("Failed to load cross-encoder: {}", e),
            }
        })?;
        debug!(model = %spec.name, architecture = ?model.architecture(), "Cross-encoder built");
        let tokenizer = load_tokenizer(&files.tokenizer, Some(DEFAULT_MAX_SEQ_LEN))?;

        Ok(Self {
            backend: RerankerBackend::Model {
                model,
                tokenizer,
                device,
            },
        })
    }

    pub fn stub() -> Self {
        Self {
            backend: RerankerBackend::Stub,
        }
    }

    pub fn is_stub(&self) -> bool {
        matches!(self.backend, RerankerBackend::Stub)
    }

    /// Raw relevance logit of one pair (unbounded, higher is more relevant).
    pub fn score(&self, query: &str, document: &str) -> Result<f32, EngineError> {
        match &self.backend {
            RerankerBackend::Model {
                model,
                tokenizer,
                device,
            } => Self::score_with_model(model, tokenizer, device, query, document),
            RerankerBackend::Stub => Ok(Self::stub_logit(query, document)),
        }
    }

    fn score_with_model(
        model: &CrossEncoder,
        tokenizer: &Tokenizer,
        device: &Device,
        query: &str,
        document: &str,
    ) -> Result<f32, EngineError> {
        let tokens = tokenizer.encode((query, document), true).map_err(|e| {
            EngineError::TokenizationFailed {
                reason: e.to_string(),
            }
        })?;

        let token_ids = Tensor::new(tokens.get_ids(), device)?.unsqueeze(0)?;
        let type_ids = Tensor::new(tokens.get_type_ids(), device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(tokens.get_attention_mask(), device)?.unsqueeze(0)?;

        let logits = model
            .forward(&token_ids, &type_ids, &attention_mask)
            .map_err(|e| EngineError::InferenceFailed {
                reason: e.to_string(),
            })?;

        logits
            .flatten_all()?
            .to_vec1::<f32>()?
            .first()
            .copied()
            .ok_or_else(|| EngineError::InferenceFailed {
                reason: "classifier produced no logits".to_string(),
            })
    }

    /// Lexical-overlap logit: blends query recall and Jaccard similarity of the
    /// non-stop-word vocabularies, centred so a blend of 0.5 maps to 0.
    fn stub_logit(query: &str, document: &str) -> f32 {
        let query_lower = query.to_lowercase();
        let query_words = content_words(&query_lower);

        let document_lower = document.to_lowercase();
        let document_words = content_words(&document_lower);

        if query_words.is_empty() {
            return -4.0;
        }

        let matches = query_words.intersection(&document_words).count();
        let recall = matches as f32 / query_words.len() as f32;
        let union = query_words.union(&document_words).count();
        let jaccard = if union > 0 {
            matches as f32 / union as f32
        } else {
            0.0
        };

        8.0 * (0.6 * recall + 0.4 * jaccard - 0.5)
    }
}

impl PairScorer for Reranker {
    fn score_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, EngineError> {
        debug!(
            query_len = query.len(),
            num_documents = documents.len(),
            "Scoring query-document pairs"
        );

        documents
            .iter()
            .map(|document| self.score(query, document))
            .collect()
    }
}
