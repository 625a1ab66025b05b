//! Text encoder engine (embedding domain).
//!
//! Directory-backed encoders run a BERT bi-encoder through candle; the `stub`
//! identifier selects a deterministic hash-seeded encoder that needs no files.

use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::config::ModelSpec;
use crate::constants::{DEFAULT_MAX_SEQ_LEN, STUB_EMBEDDING_DIM};

use super::bert::BertEncoder;
use super::device::{RuntimeSettings, select_device};
use super::error::EngineError;
use super::utils::{EngineSource, ModelFiles, load_tokenizer, stub_seed, stub_token_count};
use super::TextEmbedder;

enum EncoderBackend {
    Model {
        model: BertEncoder,
        /// Truncating tokenizer fed to the forward pass.
        tokenizer: Tokenizer,
        /// Non-truncating tokenizer used for usage accounting.
        counter: Tokenizer,
        device: Device,
    },
    Stub {
        label: Option<String>,
    },
}

/// A loaded text encoder.
pub struct Encoder {
    backend: EncoderBackend,
    dimension: usize,
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field(
                "backend",
                &match &self.backend {
                    EncoderBackend::Model { device, .. } => format!("Model({:?})", device),
                    EncoderBackend::Stub { label } => format!("Stub({:?})", label),
                },
            )
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl Encoder {
    /// Constructs the encoder named by `spec` on the configured device.
    pub fn load(spec: &ModelSpec, settings: &RuntimeSettings) -> Result<Self, EngineError> {
        match EngineSource::parse(&spec.path) {
            EngineSource::Stub { label } => {
                warn!(model = %spec.name, "Encoder running in STUB mode");
                Ok(Self::stub(label))
            }
            EngineSource::Directory(dir) => {
                let files = ModelFiles::locate(&dir)?;
                let device = select_device(settings.device)?;

                let model = BertEncoder::load(&files, settings.dtype(), &device).map_err(|e| {
                    EngineError::ModelLoadFailed {
                        reason: format!("Failed to load BERT encoder: {}", e),
                    }
                })?;
                let tokenizer = load_tokenizer(&files.tokenizer, Some(DEFAULT_MAX_SEQ_LEN))?;
                let counter = load_tokenizer(&files.tokenizer, None)?;

                info!(
                    model = %spec.name,
                    path = %dir.display(),
                    hidden_size = model.hidden_size(),
                    "Encoder loaded"
                );

                Ok(Self {
                    dimension: model.hidden_size(),
                    backend: EncoderBackend::Model {
                        model,
                        tokenizer,
                        counter,
                        device,
                    },
                })
            }
        }
    }

    /// Creates a stub encoder; different labels produce different vectors.
    pub fn stub(label: Option<String>) -> Self {
        Self {
            backend: EncoderBackend::Stub { label },
            dimension: STUB_EMBEDDING_DIM,
        }
    }

    pub fn is_stub(&self) -> bool {
        matches!(self.backend, EncoderBackend::Stub { .. })
    }

    fn encode_one(
        &self,
        text: &str,
        model: &BertEncoder,
        tokenizer: &Tokenizer,
        device: &Device,
    ) -> Result<Vec<f32>, EngineError> {
        let encoding =
            tokenizer
                .encode(text, true)
                .map_err(|e| EngineError::TokenizationFailed {
                    reason: e.to_string(),
                })?;

        let input_ids = Tensor::new(encoding.get_ids(), device)?.unsqueeze(0)?;
        let type_ids = Tensor::new(encoding.get_type_ids(), device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), device)?.unsqueeze(0)?;

        debug!(
            text_len = text.len(),
            token_count = encoding.get_ids().len(),
            "Encoder forward pass"
        );

        let embedding = model
            .forward(&input_ids, &type_ids, Some(&attention_mask))
            .map_err(|e| EngineError::InferenceFailed {
                reason: format!("Encoder forward pass failed: {}", e),
            })?;

        Ok(embedding.flatten_all()?.to_vec1::<f32>()?)
    }

    fn encode_stub(&self, label: Option<&str>, text: &str) -> Vec<f32> {
        let mut state = stub_seed(label, text);
        let mut embedding = Vec::with_capacity(self.dimension);

        for _ in 0..self.dimension {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let value = ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0;
            embedding.push(value);
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        embedding
    }
}

impl TextEmbedder for Encoder {
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EngineError> {
        match &self.backend {
            EncoderBackend::Model {
                model,
                tokenizer,
                device,
                ..
            } => texts
                .iter()
                .map(|text| self.encode_one(text, model, tokenizer, device))
                .collect(),
            EncoderBackend::Stub { label } => Ok(texts
                .iter()
                .map(|text| self.encode_stub(label.as_deref(), text))
                .collect()),
        }
    }

    fn token_counts(&self, texts: &[String]) -> Result<Vec<usize>, EngineError> {
        match &self.backend {
            EncoderBackend::Model { counter, .. } => texts
                .iter()
                .map(|text| {
                    counter
                        .encode(text.as_str(), false)
                        .map(|encoding| encoding.get_ids().len())
                        .map_err(|e| EngineError::TokenizationFailed {
                            reason: e.to_string(),
                        })
                })
                .collect(),
            EncoderBackend::Stub { .. } => {
                Ok(texts.iter().map(|text| stub_token_count(text)).collect())
            }
        }
    }
}
