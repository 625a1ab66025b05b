//! Model runtime registry.
//!
//! One [`ModelRegistry`] per domain builds every configured engine of that
//! domain on first use and keeps them for the life of the process. Engines are
//! never evicted or replaced.
//!
//! The first build is single-flight: concurrent callers wait on the build in
//! progress instead of starting their own. The build runs in its own task, so
//! a caller that goes away mid-build does not release it to a second build. A
//! failed build is not remembered; the next caller rebuilds all models of the
//! domain from scratch.

pub mod error;
pub mod loader;


pub use error::RegistryError;
pub use loader::{EncoderLoader, EngineLoader, RerankerLoader};

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info, instrument};

use crate::config::{Domain, DomainConfig, ModelSpec};
use crate::embedding::RuntimeSettings;

/// Shared, immutable handle to a loaded engine.
pub type EngineHandle<E> = Arc<E>;

/// All engines of one domain, keyed by logical model name.
pub struct EngineSet<E> {
    engines: HashMap<String, EngineHandle<E>>,
}

impl<E> EngineSet<E> {
    pub fn get(&self, name: &str) -> Option<EngineHandle<E>> {
        self.engines.get(name).cloned()
    }

    /// Loaded model names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.engines.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<E> std::fmt::Debug for EngineSet<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSet")
            .field("models", &self.names())
            .finish()
    }
}

/// Lazily built, process-lifetime cache of one domain's engines.
pub struct ModelRegistry<L: EngineLoader> {
    domain: Domain,
    models: Arc<[ModelSpec]>,
    settings: RuntimeSettings,
    loader: Arc<L>,
    state: Arc<OnceCell<Arc<EngineSet<L::Engine>>>>,
}

impl<L: EngineLoader> std::fmt::Debug for ModelRegistry<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("domain", &self.domain)
            .field("models", &self.model_names())
            .field("settings", &self.settings)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl<L: EngineLoader> ModelRegistry<L> {
    pub fn new(config: &DomainConfig, loader: L) -> Self {
        Self {
            domain: config.domain,
            models: config.models.clone().into(),
            settings: config.runtime,
            loader: Arc::new(loader),
            state: Arc::new(OnceCell::new()),
        }
    }

    /// Configured models, in configured order.
    pub fn models(&self) -> &[ModelSpec] {
        &self.models
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    /// Whether a build has completed successfully.
    pub fn is_loaded(&self) -> bool {
        self.state.initialized()
    }

    /// Returns every engine of the domain, building them all on first call.
    pub async fn engines(&self) -> Result<Arc<EngineSet<L::Engine>>, RegistryError> {
        if let Some(set) = self.state.get() {
            return Ok(Arc::clone(set));
        }

        let state = Arc::clone(&self.state);
        let domain = self.domain;
        let models = Arc::clone(&self.models);
        let settings = self.settings;
        let loader = Arc::clone(&self.loader);

        // The init permit belongs to the spawned task, not to this caller.
        tokio::spawn(async move {
            state
                .get_or_try_init(|| build(domain, models, settings, loader))
                .await
                .map(Arc::clone)
        })
        .await
        .map_err(|e| RegistryError::BuildAborted {
            domain,
            reason: e.to_string(),
        })?
    }

    /// Returns one engine by logical name, building the domain if needed.
    pub async fn engine(&self, name: &str) -> Result<EngineHandle<L::Engine>, RegistryError> {
        self.engines()
            .await?
            .get(name)
            .ok_or_else(|| RegistryError::UnknownModel {
                domain: self.domain,
                name: name.to_string(),
            })
    }
}

#[instrument(skip_all, fields(domain = %domain))]
async fn build<L: EngineLoader>(
    domain: Domain,
    models: Arc<[ModelSpec]>,
    settings: RuntimeSettings,
    loader: Arc<L>,
) -> Result<Arc<EngineSet<L::Engine>>, RegistryError> {
    tokio::task::spawn_blocking(move || build_all(domain, &models, &settings, loader.as_ref()))
        .await
        .map_err(|e| RegistryError::BuildAborted {
            domain,
            reason: e.to_string(),
        })?
        .map(Arc::new)
}

fn build_all<L: EngineLoader>(
    domain: Domain,
    models: &[ModelSpec],
    settings: &RuntimeSettings,
    loader: &L,
) -> Result<EngineSet<L::Engine>, RegistryError> {
    info!(
        domain = %domain,
        device = %settings.device,
        use_fp16 = settings.use_fp16,
        models = ?models.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
        "Initialising engines"
    );

    let mut engines = HashMap::with_capacity(models.len());
    for spec in models {
        match loader.load(spec, settings) {
            Ok(engine) => {
                info!(
                    domain = %domain,
                    name = %spec.name,
                    path = %spec.path,
                    device = %settings.device,
                    fp16 = settings.use_fp16,
                    "Model ready"
                );
                engines.insert(spec.name.clone(), Arc::new(engine));
            }
            Err(e) => {
                error!(
                    domain = %domain,
                    name = %spec.name,
                    path = %spec.path,
                    error = %e,
                    "Model initialisation failed"
                );
                return Err(RegistryError::ModelInit {
                    name: spec.name.clone(),
                    path: spec.path.clone(),
                    source: e,
                });
            }
        }
    }

    Ok(EngineSet { engines })
}
