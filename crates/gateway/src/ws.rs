use crate::error::{AppError, AppResult};
use crate::routes::VideoQuery;
use crate::state::AppState;
use annotation::{DetectionBatcher, LiveAnnotator, spawn_camera_stream, spawn_frame_stream};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use image::RgbImage;
use schema::{Detection, DetectionMessage};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};

/// Freeze transitions as they happen.
pub async fn freeze(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| freeze_socket(socket, state))
}

/// Per-frame detections for a stored video; errors before the upgrade are
/// plain HTTP responses.
pub async fn video(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(examination_id): Path<String>,
    Query(query): Query<VideoQuery>,
) -> AppResult<Response> {
    let source = PathBuf::from(&query.video_path);
    let rx = spawn_frame_stream(
        &state.pipeline,
        &examination_id,
        &source,
        state.config.channel_capacity,
    )
    .await?;

    Ok(ws.on_upgrade(move |socket| detection_socket(socket, state, examination_id, rx)))
}

/// Per-frame detections from the server-side camera.
pub async fn camera(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(examination_id): Path<String>,
) -> AppResult<Response> {
    let rx = spawn_camera_stream(
        &state.pipeline,
        &examination_id,
        &state.config.camera_source,
        state.config.channel_capacity,
    )
    .await?;

    Ok(ws.on_upgrade(move |socket| detection_socket(socket, state, examination_id, rx)))
}

/// Client-pushed frames (binary image or base64 text), answered one by one.
pub async fn frames(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(examination_id): Path<String>,
) -> AppResult<Response> {
    if state
        .pipeline
        .store()
        .examination(&examination_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(format!(
            "Examination {} not found",
            examination_id
        )));
    }

    Ok(ws.on_upgrade(move |socket| frames_socket(socket, state, examination_id)))
}

fn keepalive(state: &AppState) -> Interval {
    let period = state.config.keepalive;
    let mut interval = time::interval_at(time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn send_json<T: Serialize>(socket: &mut WebSocket, payload: &T) -> bool {
    match serde_json::to_string(payload) {
        Ok(text) => socket.send(Message::Text(text)).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "JSON serialization error");
            true
        }
    }
}

async fn freeze_socket(mut socket: WebSocket, state: AppState) {
    let (id, mut rx) = state.monitor.subscribe();
    let mut ping = keepalive(&state);
    tracing::info!(subscriber = id, "Freeze socket connected");

    loop {
        tokio::select! {
            status = rx.recv() => {
                // None: evicted as a lagging subscriber
                let Some(status) = status else { break };
                if !send_json(&mut socket, &status).await {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = ping.tick() => {
                if socket.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.monitor.unsubscribe(id);
    tracing::info!(subscriber = id, "Freeze socket disconnected");
}

async fn detection_socket(
    mut socket: WebSocket,
    state: AppState,
    examination_id: String,
    mut rx: mpsc::Receiver<Vec<Detection>>,
) {
    let mut batcher = DetectionBatcher::new(
        state.pipeline.store().clone(),
        &examination_id,
        state.config.stream_batch_frames,
    );
    let mut ping = keepalive(&state);
    let mut exhausted = false;

    loop {
        tokio::select! {
            detections = rx.recv() => {
                let Some(detections) = detections else {
                    exhausted = true;
                    break;
                };
                if let Err(e) = batcher.push_frame(&detections).await {
                    tracing::error!(examination_id = %examination_id, error = %e, "Cannot persist streamed detections");
                }
                if !send_json(&mut socket, &DetectionMessage::from_detections(&detections)).await {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = ping.tick() => {
                if socket.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    // Stops the producer within one frame
    drop(rx);
    close_batcher(batcher, &examination_id).await;
    if exhausted {
        let _ = socket.send(Message::Close(None)).await;
    }
}

async fn frames_socket(mut socket: WebSocket, state: AppState, examination_id: String) {
    let mut annotator = LiveAnnotator::new(
        &examination_id,
        state.pipeline.detector().clone(),
        state.pipeline.clock().clone(),
        "live",
    );
    let mut batcher = DetectionBatcher::new(
        state.pipeline.store().clone(),
        &examination_id,
        state.config.stream_batch_frames,
    );
    let mut ping = keepalive(&state);

    loop {
        let incoming = tokio::select! {
            incoming = socket.recv() => incoming,
            _ = ping.tick() => {
                if socket.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
                continue;
            }
        };

        let decoded = match incoming {
            Some(Ok(Message::Binary(bytes))) => capture::decode_image(&bytes),
            Some(Ok(Message::Text(text))) => capture::decode_base64_image(&text),
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
            Some(Ok(_)) => continue,
        };

        let image = match decoded {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(examination_id = %examination_id, error = %e, "Undecodable frame, closing socket");
                let _ = send_json(&mut socket, &serde_json::json!({ "error": e.to_string() })).await;
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        };

        let (returned, detections) = match annotate(annotator, image).await {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(examination_id = %examination_id, error = %e, "Annotation task failed");
                break;
            }
        };
        annotator = returned;

        if let Err(e) = batcher.push_frame(&detections).await {
            tracing::error!(examination_id = %examination_id, error = %e, "Cannot persist live detections");
        }
        if !send_json(&mut socket, &DetectionMessage::from_detections(&detections)).await {
            break;
        }
    }

    close_batcher(batcher, &examination_id).await;
}

async fn annotate(
    mut annotator: LiveAnnotator,
    image: RgbImage,
) -> Result<(LiveAnnotator, Vec<Detection>), tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || {
        let detections = annotator.annotate(&image);
        (annotator, detections)
    })
    .await
}

async fn close_batcher(batcher: DetectionBatcher, examination_id: &str) {
    match batcher.close().await {
        Ok(committed) => tracing::info!(examination_id, committed, "Detection stream closed"),
        Err(e) => tracing::error!(examination_id = %examination_id, error = %e, "Cannot persist final detections"),
    }
}
