use std::sync::Arc;

use crate::auth::AuthPolicy;
use crate::config::Config;
use crate::registry::{EncoderLoader, EngineLoader, ModelRegistry, RerankerLoader};

/// Shared handler state: one registry per domain plus the auth policy.
pub struct AppState<E: EngineLoader, R: EngineLoader> {
    pub embedding: Arc<ModelRegistry<E>>,
    pub rerank: Arc<ModelRegistry<R>>,
    pub auth: Arc<AuthPolicy>,
}

impl<E: EngineLoader, R: EngineLoader> Clone for AppState<E, R> {
    fn clone(&self) -> Self {
        Self {
            embedding: Arc::clone(&self.embedding),
            rerank: Arc::clone(&self.rerank),
            auth: Arc::clone(&self.auth),
        }
    }
}

impl<E: EngineLoader, R: EngineLoader> AppState<E, R> {
    pub fn new(embedding: ModelRegistry<E>, rerank: ModelRegistry<R>, auth: AuthPolicy) -> Self {
        Self {
            embedding: Arc::new(embedding),
            rerank: Arc::new(rerank),
            auth: Arc::new(auth),
        }
    }
}

/// State served by the binary.
pub type ServiceState = AppState<EncoderLoader, RerankerLoader>;

impl ServiceState {
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ModelRegistry::new(&config.embedding, EncoderLoader),
            ModelRegistry::new(&config.rerank, RerankerLoader),
            AuthPolicy::from(&config.auth),
        )
    }
}
