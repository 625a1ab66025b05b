use crate::config::ModelSpec;
use crate::embedding::{Encoder, EngineError, Reranker, RuntimeSettings};

/// Constructs one engine from its model descriptor.
///
/// `load` is blocking (file I/O, weight upload to the device); the registry
/// always calls it off the async workers.
pub trait EngineLoader: Send + Sync + 'static {
    type Engine: Send + Sync + 'static;

    fn load(&self, spec: &ModelSpec, settings: &RuntimeSettings)
    -> Result<Self::Engine, EngineError>;
}

/// Loads [`Encoder`]s for the embedding domain.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncoderLoader;

impl EngineLoader for EncoderLoader {
    type Engine = Encoder;

    fn load(&self, spec: &ModelSpec, settings: &RuntimeSettings) -> Result<Encoder, EngineError> {
        Encoder::load(spec, settings)
    }
}

/// Loads [`Reranker`]s for the rerank domain.
#[derive(Debug, Clone, Copy, Default)]
pub struct RerankerLoader;

impl EngineLoader for RerankerLoader {
    type Engine = Reranker;

    fn load(&self, spec: &ModelSpec, settings: &RuntimeSettings) -> Result<Reranker, EngineError> {
        Reranker::load(spec, settings)
    }
}
