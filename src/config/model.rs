//! Served domains and the model descriptors configured for them.

use std::fmt;

use crate::embedding::RuntimeSettings;

/// One of the two served capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Embedding,
    Rerank,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Embedding => "embedding",
            Domain::Rerank => "rerank",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logical model name bound to its backing identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// Unique within the domain; the name clients send as `model`.
    pub name: String,
    /// Model directory, or `stub` / `stub:<label>` for the stub engine.
    pub path: String,
    pub domain: Domain,
}

impl ModelSpec {
    pub fn new(domain: Domain, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            domain,
        }
    }
}

/// Everything the registry of one domain needs.
#[derive(Debug, Clone)]
pub struct DomainConfig {
    pub domain: Domain,
    /// Ordered; the first entry is the default model.
    pub models: Vec<ModelSpec>,
    pub runtime: RuntimeSettings,
}

impl DomainConfig {
    /// The model used when a request does not name one.
    pub fn default_model(&self) -> Option<&ModelSpec> {
        self.models.first()
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }
}
