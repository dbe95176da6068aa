use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, instrument, warn};

use netgate_backend::api::{self, AppState};
use netgate_backend::config::{AppConfig, ConfigManager};
use netgate_backend::control::ControlService;
use netgate_backend::environment::{Environment, EnvironmentDetector};
use netgate_backend::execution::{CommandRunner, ExecutionContextResolver, SystemCommandRunner};
use netgate_backend::network::NetworkInfoService;
use netgate_backend::query::QueryExecutor;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigManager::from_cli_and_env()?;
    config.validate()?;
    config.init_logging()?;

    info!("Starting netgate backend v{}", env!("CARGO_PKG_VERSION"));

    let state = build_state(&config.app);

    if config.app.hotspot_on_start {
        // The API stays useful without the hotspot
        if let Err(e) = state.control.start_hotspot().await {
            error!("Hotspot creation at startup failed: {}: {}", e, e.details());
        }
    }

    let listener = TcpListener::bind(config.app.listen)
        .await
        .with_context(|| format!("binding {}", config.app.listen))?;

    api::serve(listener, api::build_router(state), shutdown_signal()).await
}

#[instrument(skip_all)]
fn build_state(config: &AppConfig) -> AppState {
    let runner: Arc<dyn CommandRunner> =
        Arc::new(SystemCommandRunner::with_timeout(config.command_timeout));
    let detector = EnvironmentDetector::new(runner.clone());
    info!(
        "Runtime environment: containerized={}",
        detector.is_containerized()
    );

    let resolver = ExecutionContextResolver::new(Arc::new(detector));
    let network = NetworkInfoService::new(QueryExecutor::new(resolver.clone(), runner.clone()));
    let control = ControlService::new(
        runner,
        resolver,
        config.hotspot.clone(),
        config.bridge.clone(),
    );

    AppState::new(network, control)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
