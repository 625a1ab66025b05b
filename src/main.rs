//! vecrank HTTP server entrypoint.

use std::net::SocketAddr;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use vecrank::config::Config;
use vecrank::gateway::{ServiceState, create_router};
use vecrank::telemetry;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check().await);
    }

    let config = Config::load()?;
    let log_guard = telemetry::init(&config.logging)?;
    let addr: SocketAddr = config.server.socket_addr().parse()?;

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        embedding_models = ?config.embedding.model_names(),
        rerank_models = ?config.rerank.model_names(),
        auth_enabled = config.auth.enabled,
        "vecrank starting"
    );
    if config.auth.enabled && config.auth.keys.is_empty() {
        tracing::warn!("Auth is enabled without any token; every request will be rejected");
    }

    let state = ServiceState::from_config(&config);

    if config.server.warmup {
        tracing::info!("Warming up engines before accepting traffic");
        state.embedding.engines().await?;
        state.rerank.engines().await?;
        tracing::info!("Warmup complete");
    }

    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("vecrank shutdown complete");
    drop(log_guard);
    Ok(())
}

/// Probes `/healthz` on the configured port; exit code 0 when healthy.
async fn run_health_check() -> i32 {
    let Ok(config) = Config::load() else {
        return 1;
    };
    let url = format!("http://127.0.0.1:{}/healthz", config.server.port);

    let Ok(client) = reqwest::Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
    else {
        return 1;
    };

    let mut request = client.get(&url);
    if config.auth.enabled
        && let Some(token) = config.auth.keys.iter().next()
    {
        request = request.bearer_auth(token);
    }

    match request.send().await {
        Ok(res) if res.status().is_success() => 0,
        _ => 1,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
