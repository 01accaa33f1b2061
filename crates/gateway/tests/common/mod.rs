#![allow(dead_code)]

use annotation::{AnnotationPipeline, Overlay, SteppingClock};
use axum::Router;
use capture::ImageSequenceBackend;
use gateway::{AppState, GatewayConfig, router};
use image::{Rgb, RgbImage};
use inference::{ObjectDetector, shared};
use monitor::{FreezeMonitor, MonitorConfig, SimilarityMetric};
use schema::{BoundingBoxDetection, Examination};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use store::SqliteStore;
use tempfile::TempDir;

/// Frames per detection commit on streaming sockets.
pub const BATCH_FRAMES: usize = 2;

pub struct FixedBoxDetector;

impl ObjectDetector for FixedBoxDetector {
    fn detect(&mut self, _frame: &RgbImage) -> anyhow::Result<Vec<BoundingBoxDetection>> {
        Ok(vec![BoundingBoxDetection::new(
            4.0, 4.0, 20.0, 20.0, "forceps", 0.75,
        )])
    }
}

pub struct TestApp {
    pub dir: TempDir,
    pub app: Router,
    pub state: AppState,
    /// Three-frame stored video.
    pub video: PathBuf,
    /// Directory behind `/ws/camera`; absent until a test writes it.
    pub camera: PathBuf,
}

pub fn write_frames(dir: &Path, values: &[u8]) {
    std::fs::create_dir_all(dir).unwrap();
    for (i, v) in values.iter().enumerate() {
        RgbImage::from_pixel(32, 32, Rgb([*v, *v, *v]))
            .save(dir.join(format!("{:04}.png", i)))
            .unwrap();
    }
}

pub fn png(value: u8) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    RgbImage::from_pixel(32, 32, Rgb([value, value, value]))
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// App over an in-memory store holding `exam-1` and `exam-2`. The freeze
/// monitor reads `<tmp>/<freeze_source>`, or a missing directory when empty.
pub async fn test_app(freeze_source: &str) -> TestApp {
    let dir = TempDir::new().unwrap();
    let video = dir.path().join("clip");
    write_frames(&video, &[10, 20, 30]);
    let camera = dir.path().join("scope");

    let store = SqliteStore::in_memory().await.unwrap();
    for id in ["exam-1", "exam-2"] {
        store
            .create_examination(&Examination::new(
                id,
                dir.path().join(id).display().to_string(),
            ))
            .await
            .unwrap();
    }

    let backend = Arc::new(ImageSequenceBackend::new(25.0));
    let pipeline = AnnotationPipeline::new(
        Arc::new(store),
        backend.clone(),
        shared(FixedBoxDetector),
        Overlay::default(),
    )
    .with_clock(Arc::new(SteppingClock::new(Duration::from_millis(40))));

    let source = if freeze_source.is_empty() {
        dir.path().join("missing-camera").display().to_string()
    } else {
        dir.path().join(freeze_source).display().to_string()
    };
    let monitor_config = MonitorConfig {
        source,
        sample_interval: Duration::from_millis(10),
        frame_threshold: 1,
        metric: SimilarityMetric::PixelDiff {
            max_changed_pixels: 10,
        },
        screenshot_dir: None,
        subscriber_capacity: 4,
    };
    let monitor = FreezeMonitor::with_backend(monitor_config, backend);

    let config = GatewayConfig {
        stream_batch_frames: BATCH_FRAMES,
        camera_source: camera.display().to_string(),
        ..GatewayConfig::default()
    };
    let state = AppState::new(config, pipeline, monitor);
    TestApp {
        app: router(state.clone()),
        state,
        dir,
        video,
        camera,
    }
}
