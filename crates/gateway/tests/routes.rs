mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::*;
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

async fn send(app: &Router, method: &str, uri: &str, body: Body) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

// ========== Health ==========

#[tokio::test]
async fn health_reports_ok() {
    let t = test_app("").await;
    let (status, body) = send(&t.app, "GET", "/health", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

// ========== Annotation ==========

#[tokio::test]
async fn process_video_then_list_detections() {
    let t = test_app("").await;
    let uri = format!(
        "/examinations/exam-1/process_video?video_path={}",
        t.video.display()
    );

    let (status, body) = send(&t.app, "POST", &uri, Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["annotated_video_filename"], "clip_detection");
    let detections = body["detections"].as_array().unwrap();
    assert_eq!(detections.len(), 3);
    assert_eq!(detections[0]["label"], "forceps");
    assert_eq!(detections[0]["x1"], 4);

    let (status, listed) = send(&t.app, "GET", "/examinations/exam-1/detections", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let timestamps: Vec<f64> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["timestamp"].as_f64().unwrap())
        .collect();
    assert_eq!(timestamps.len(), 3);
    assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn process_video_unknown_examination_is_404() {
    let t = test_app("").await;
    let uri = format!(
        "/examinations/nobody/process_video?video_path={}",
        t.video.display()
    );

    let (status, body) = send(&t.app, "POST", &uri, Body::empty()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn process_video_unreadable_source_is_400() {
    let t = test_app("").await;
    let uri = format!(
        "/examinations/exam-1/process_video?video_path={}",
        t.dir.path().join("nothing-here").display()
    );

    let (status, body) = send(&t.app, "POST", &uri, Body::empty()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn detections_empty_is_404() {
    let t = test_app("").await;
    let (status, body) = send(&t.app, "GET", "/examinations/exam-2/detections", Body::empty()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("exam-2"));
}

// ========== Freeze Monitor ==========

#[tokio::test]
async fn freeze_status_before_start() {
    let t = test_app("").await;
    let (status, body) = send(&t.app, "GET", "/freeze-status", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["freeze"], false);
    assert!(body["screenshot"].is_null());
}

#[tokio::test]
async fn start_without_source_is_503_and_stop_is_idempotent() {
    let t = test_app("").await;

    let (status, body) = send(&t.app, "POST", "/start-freeze-detection", Body::empty()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SOURCE_UNAVAILABLE");
    assert!(!t.state.monitor.is_running());

    let (status, body) = send(&t.app, "POST", "/stop-freeze-detection", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "stopped");
}

#[tokio::test]
async fn start_then_status_reports_freeze() {
    let t = test_app("camera").await;
    write_frames(&t.dir.path().join("camera"), &[50, 50, 50]);

    let (status, body) = send(&t.app, "POST", "/start-freeze-detection", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "started");

    let mut frozen = Value::Null;
    for _ in 0..200 {
        let (_, body) = send(&t.app, "GET", "/freeze-status", Body::empty()).await;
        if body["freeze"] == true {
            frozen = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(frozen["screenshot"].is_string());

    let (status, _) = send(&t.app, "POST", "/stop-freeze-detection", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!t.state.monitor.is_running());
}

#[tokio::test]
async fn posted_frames_detect_freeze() {
    let t = test_app("").await;

    let (_, first) = send(&t.app, "POST", "/frame", Body::from(png(10))).await;
    let (_, same) = send(&t.app, "POST", "/frame", Body::from(png(10))).await;
    let (_, changed) = send(&t.app, "POST", "/frame", Body::from(png(99))).await;

    assert_eq!(first["freeze"], false);
    assert_eq!(same["freeze"], true);
    assert_eq!(changed["freeze"], false);
}

#[tokio::test]
async fn posted_garbage_frame_is_400() {
    let t = test_app("").await;
    let (status, body) = send(&t.app, "POST", "/frame", Body::from("not an image")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}
