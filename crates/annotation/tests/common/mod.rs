#![allow(dead_code)]

use annotation::{AnnotationPipeline, Overlay, SteppingClock};
use capture::{
    CaptureError, FrameSink, FrameSource, ImageSequenceBackend, VideoBackend, VideoProperties,
};
use image::{Rgb, RgbImage};
use inference::{ObjectDetector, SharedDetector, shared};
use schema::{BoundingBoxDetection, Examination};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use store::SqliteStore;
use tempfile::TempDir;

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 64;

/// Always reports `{10, 10, 50, 50, "tool", 0.9}`.
pub struct FixedBoxDetector;

impl ObjectDetector for FixedBoxDetector {
    fn detect(&mut self, _frame: &RgbImage) -> anyhow::Result<Vec<BoundingBoxDetection>> {
        Ok(vec![BoundingBoxDetection::new(
            10.0, 10.0, 50.0, 50.0, "tool", 0.9,
        )])
    }
}

/// Fails on the listed frame numbers (0-based call count), fixed box otherwise.
pub struct FlakyDetector {
    pub fail_on: Vec<usize>,
    pub calls: usize,
}

impl ObjectDetector for FlakyDetector {
    fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<Vec<BoundingBoxDetection>> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_on.contains(&call) {
            anyhow::bail!("inference failed on call {}", call);
        }
        FixedBoxDetector.detect(frame)
    }
}

/// Image-sequence backend whose writer fails after `fail_after` frames.
pub struct FailingSinkBackend {
    pub inner: ImageSequenceBackend,
    pub fail_after: u64,
}

struct FailingSink {
    inner: Box<dyn FrameSink>,
    written: u64,
    fail_after: u64,
}

impl FrameSink for FailingSink {
    fn write(&mut self, image: &RgbImage) -> Result<(), CaptureError> {
        if self.written >= self.fail_after {
            return Err(CaptureError::Write {
                index: self.written,
                reason: "No space left on device".to_string(),
            });
        }
        self.written += 1;
        self.inner.write(image)
    }

    fn finish(&mut self) -> Result<u64, CaptureError> {
        self.inner.finish()
    }
}

impl VideoBackend for FailingSinkBackend {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>, CaptureError> {
        self.inner.open_source(path)
    }

    fn open_live(&self, source: &str) -> Result<Box<dyn FrameSource>, CaptureError> {
        self.inner.open_live(source)
    }

    fn open_sink(
        &self,
        path: &Path,
        properties: &VideoProperties,
    ) -> Result<Box<dyn FrameSink>, CaptureError> {
        Ok(Box::new(FailingSink {
            inner: self.inner.open_sink(path, properties)?,
            written: 0,
            fail_after: self.fail_after,
        }))
    }

    fn output_extension(&self, source: &Path) -> String {
        self.inner.output_extension(source)
    }
}

/// Opens every source as a stream that reports its size but yields no frame.
pub struct EmptySourceBackend {
    pub inner: ImageSequenceBackend,
}

struct EmptySource;

impl FrameSource for EmptySource {
    fn properties(&self) -> VideoProperties {
        VideoProperties {
            width: WIDTH,
            height: HEIGHT,
            fps: 30.0,
        }
    }

    fn next_frame(&mut self) -> Result<Option<capture::Frame>, CaptureError> {
        Ok(None)
    }
}

impl VideoBackend for EmptySourceBackend {
    fn open_source(&self, _path: &Path) -> Result<Box<dyn FrameSource>, CaptureError> {
        Ok(Box::new(EmptySource))
    }

    fn open_live(&self, _source: &str) -> Result<Box<dyn FrameSource>, CaptureError> {
        Ok(Box::new(EmptySource))
    }

    fn open_sink(
        &self,
        path: &Path,
        properties: &VideoProperties,
    ) -> Result<Box<dyn FrameSink>, CaptureError> {
        self.inner.open_sink(path, properties)
    }

    fn output_extension(&self, source: &Path) -> String {
        self.inner.output_extension(source)
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub store: Arc<SqliteStore>,
    pub video: PathBuf,
    pub exam_folder: PathBuf,
}

impl Fixture {
    /// In-memory store with examination `exam-1` and a `frames`-frame video.
    pub async fn new(frames: u8) -> Self {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("videos").join("clip");
        write_video(&video, frames);

        let exam_folder = dir.path().join("exams").join("exam-1");
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .create_examination(&Examination::new(
                "exam-1",
                exam_folder.display().to_string(),
            ))
            .await
            .unwrap();

        Self {
            dir,
            store: Arc::new(store),
            video,
            exam_folder,
        }
    }

    pub fn pipeline(&self, detector: SharedDetector) -> AnnotationPipeline {
        self.pipeline_with_backend(detector, Arc::new(ImageSequenceBackend::new(30.0)))
    }

    pub fn pipeline_with_backend(
        &self,
        detector: SharedDetector,
        backend: Arc<dyn VideoBackend>,
    ) -> AnnotationPipeline {
        AnnotationPipeline::new(self.store.clone(), backend, detector, Overlay::default())
            .with_clock(Arc::new(SteppingClock::new(Duration::from_millis(40))))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.exam_folder.join("clip_detection")
    }

    /// Replace the source video with a `frames`-frame one.
    pub fn rewrite_video(&self, frames: u8) {
        std::fs::remove_dir_all(&self.video).unwrap();
        write_video(&self.video, frames);
    }

    /// Entries of the examination folder other than the final output.
    pub fn leftovers(&self) -> Vec<String> {
        std::fs::read_dir(&self.exam_folder)
            .map(|entries| {
                entries
                    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                    .filter(|name| name != "clip_detection")
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Frame `i` carries `i * 20` in the red channel of its bottom-right pixel,
/// outside the area any test box or caption touches.
pub fn write_video(dir: &Path, frames: u8) {
    std::fs::create_dir_all(dir).unwrap();
    for i in 0..frames {
        let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([30, 30, 30]));
        img.put_pixel(WIDTH - 1, HEIGHT - 1, Rgb([i * 20, 0, 0]));
        img.save(dir.join(format!("{:04}.png", i))).unwrap();
    }
}

pub fn marker(img: &RgbImage) -> u8 {
    img.get_pixel(WIDTH - 1, HEIGHT - 1)[0]
}

pub fn output_frames(dir: &Path) -> Vec<RgbImage> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    paths.sort();
    paths
        .iter()
        .map(|p| image::open(p).unwrap().to_rgb8())
        .collect()
}

pub fn fixed() -> SharedDetector {
    shared(FixedBoxDetector)
}
