use annotation::{AnnotationPipeline, Overlay};
use capture::CaptureConfig;
use common::{Environment, TelemetryGuard, setup_logging};
use gateway::{AppState, GatewayConfig, run_server};
use inference::{InferenceConfig, build_detector};
use monitor::{FreezeMonitor, MonitorConfig};
use std::sync::Arc;
use store::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();
    let config = GatewayConfig::from_env();

    let _telemetry = match &config.otlp_endpoint {
        Some(endpoint) => Some(TelemetryGuard::init("gateway", endpoint, environment)?),
        None => {
            setup_logging(environment);
            None
        }
    };

    let store = Arc::new(SqliteStore::connect(&config.database_url).await?);
    tracing::info!(url = %config.database_url, "Database ready");

    let inference_config = InferenceConfig::from_env();
    let detector = build_detector(&inference_config)?;
    tracing::info!(model = %inference_config.model_path, "Detector loaded");

    let overlay = Overlay::from_font_path(config.overlay_font_path.as_deref())?;
    let backend = capture::default_backend(&CaptureConfig::from_env());

    let pipeline = AnnotationPipeline::new(store, backend.clone(), detector, overlay);
    let monitor = FreezeMonitor::with_backend(MonitorConfig::from_env(), backend);

    let state = AppState::new(config.clone(), pipeline, monitor);
    run_server(&config, state.clone(), shutdown_signal()).await?;

    tracing::info!("Server stopped accepting connections, stopping freeze monitor");
    let monitor = state.monitor.clone();
    tokio::task::spawn_blocking(move || monitor.stop()).await?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl-C");
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
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
