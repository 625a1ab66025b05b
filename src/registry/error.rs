use thiserror::Error;

use crate::config::Domain;
use crate::embedding::EngineError;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// One configured model could not be constructed; the whole domain build
    /// was discarded.
    #[error("failed to load model '{name}' from '{path}': {source}")]
    ModelInit {
        name: String,
        path: String,
        #[source]
        source: EngineError,
    },

    #[error("model '{name}' is not configured for the {domain} domain")]
    UnknownModel { domain: Domain, name: String },

    /// The blocking build task panicked or was cancelled.
    #[error("{domain} engine build aborted: {reason}")]
    BuildAborted { domain: Domain, reason: String },
}
