//! Test server harness.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use vecrank::config::{AuthConfig, Config, Domain, ModelSpec};
use vecrank::gateway::{ServiceState, create_router};

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;

#[derive(Debug, Clone)]
pub struct TestServerConfig {
    pub embedding_models: Vec<(String, String)>,
    pub rerank_models: Vec<(String, String)>,
    pub auth_enabled: bool,
    pub auth_keys: Vec<String>,
    pub warmup: bool,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            embedding_models: vec![
                ("bge-small".to_string(), "stub:bge-small".to_string()),
                ("e5-base".to_string(), "stub:e5-base".to_string()),
            ],
            rerank_models: vec![("ms-marco".to_string(), "stub".to_string())],
            auth_enabled: false,
            auth_keys: Vec::new(),
            warmup: false,
        }
    }
}

impl TestServerConfig {
    pub fn with_auth(mut self, keys: &[&str]) -> Self {
        self.auth_enabled = true;
        self.auth_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    fn into_config(self) -> Config {
        let mut config = Config::default();
        config.embedding.models = specs(Domain::Embedding, self.embedding_models);
        config.rerank.models = specs(Domain::Rerank, self.rerank_models);
        config.auth = AuthConfig {
            enabled: self.auth_enabled,
            keys: self.auth_keys.into_iter().collect(),
        };
        config.server.warmup = self.warmup;
        config
    }
}

fn specs(domain: Domain, models: Vec<(String, String)>) -> Vec<ModelSpec> {
    models
        .into_iter()
        .map(|(name, path)| ModelSpec::new(domain, name, path))
        .collect()
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: ServiceState,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn wait_for_server_ready(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }

        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => {
                tokio::time::sleep(interval).await;
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Server startup failed: {0}")]
    StartupFailed(String),
}

/// Spawns a server on an ephemeral port backed by stub engines.
///
/// The returned [`TestServer`] exposes the shared state so tests can inspect
/// the registries directly.
pub async fn spawn_test_server(config: TestServerConfig) -> Result<TestServer, ServerStartupError> {
    let config = config.into_config();
    config
        .validate()
        .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;

    let state = ServiceState::from_config(&config);
    if config.server.warmup {
        state
            .embedding
            .engines()
            .await
            .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;
        state
            .rerank
            .engines()
            .await
            .map_err(|e| ServerStartupError::StartupFailed(e.to_string()))?;
    }

    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let local_addr = listener.local_addr()?;

    let app = create_router(state.clone());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    wait_for_server_ready(
        local_addr,
        Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
        Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
    )
    .await?;

    Ok(TestServer {
        addr: local_addr,
        state,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
    })
}
