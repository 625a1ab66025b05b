//! Inference engines and model utilities.
//!
//! - [`encoder`] turns text into dense vectors (embedding domain).
//! - [`reranker`] scores query/document pairs (rerank domain).
//!
//! Both accept the `stub` backing identifier for a deterministic engine that
//! needs no model files.

/// BERT encoder and classifier wrappers.
pub mod bert;
/// Device selection (CPU / CUDA) and precision.
pub mod device;
/// Bi-encoder engine.
pub mod encoder;
mod error;
/// Cross-encoder engine.
pub mod reranker;
/// Tokenizer/model loading helpers.
pub mod utils;

pub use device::{DeviceKind, RuntimeSettings, select_device};
pub use encoder::Encoder;
pub use error::EngineError;
pub use reranker::Reranker;
pub use utils::EngineSource;

/// Encode contract of an embedding engine.
///
/// Both operations are deterministic for identical input and model.
pub trait TextEmbedder: Send + Sync {
    /// One dense vector per input, in input order.
    fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EngineError>;

    /// Tokens per input, without special tokens.
    fn token_counts(&self, texts: &[String]) -> Result<Vec<usize>, EngineError>;
}

/// Pairwise scoring contract of a rerank engine.
pub trait PairScorer: Send + Sync {
    /// One raw (unnormalised) relevance score per document, in document order.
    fn score_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, EngineError>;
}
