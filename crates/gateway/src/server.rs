use crate::config::GatewayConfig;
use crate::routes;
use crate::state::AppState;
use crate::ws;
use axum::{
    Router,
    routing::{get, post},
};
use std::future::Future;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/examinations/:id/process_video",
            post(routes::process_video),
        )
        .route("/examinations/:id/detections", get(routes::detections))
        .route(
            "/start-freeze-detection",
            post(routes::start_freeze_detection),
        )
        .route("/stop-freeze-detection", post(routes::stop_freeze_detection))
        .route("/freeze-status", get(routes::freeze_status))
        .route("/frame", post(routes::frame))
        .route("/ws/freeze", get(ws::freeze))
        .route("/ws/video/:id", get(ws::video))
        .route("/ws/frames/:id", get(ws::frames))
        .route("/ws/camera/:id", get(ws::camera))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(
    config: &GatewayConfig,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    tracing::info!(addr = %config.addr, "Gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
