use crate::error::{AppError, AppResult};
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use schema::{AnnotationResult, Detection, FreezeStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct VideoQuery {
    pub video_path: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
pub struct ControlResponse {
    status: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FrameFreeze {
    pub freeze: bool,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn process_video(
    State(state): State<AppState>,
    Path(examination_id): Path<String>,
    Query(query): Query<VideoQuery>,
) -> AppResult<Json<AnnotationResult>> {
    let source = PathBuf::from(&query.video_path);
    let result = state.pipeline.process_video(&examination_id, &source).await?;
    Ok(Json(result))
}

pub async fn detections(
    State(state): State<AppState>,
    Path(examination_id): Path<String>,
) -> AppResult<Json<Vec<Detection>>> {
    let detections = state.pipeline.store().detections_for(&examination_id).await?;
    if detections.is_empty() {
        return Err(AppError::NotFound(format!(
            "No detections found for examination {}",
            examination_id
        )));
    }
    Ok(Json(detections))
}

pub async fn start_freeze_detection(
    State(state): State<AppState>,
) -> AppResult<Json<ControlResponse>> {
    let monitor = state.monitor.clone();
    tokio::task::spawn_blocking(move || monitor.start())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(Json(ControlResponse { status: "started" }))
}

pub async fn stop_freeze_detection(
    State(state): State<AppState>,
) -> AppResult<Json<ControlResponse>> {
    let monitor = state.monitor.clone();
    tokio::task::spawn_blocking(move || monitor.stop())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(ControlResponse { status: "stopped" }))
}

pub async fn freeze_status(State(state): State<AppState>) -> Json<FreezeStatus> {
    Json(state.monitor.status())
}

/// One frame from a client that samples its own feed.
pub async fn frame(State(state): State<AppState>, body: Bytes) -> AppResult<Json<FrameFreeze>> {
    let detector = state.frame_detector.clone();
    let freeze = tokio::task::spawn_blocking(move || {
        let image = capture::decode_image(&body).map_err(|e| AppError::BadRequest(e.to_string()))?;
        let mut detector = detector
            .lock()
            .map_err(|_| AppError::Internal("frame detector poisoned".to_string()))?;
        detector.observe(&image);
        Ok::<_, AppError>(detector.is_frozen())
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(Json(FrameFreeze { freeze }))
}
