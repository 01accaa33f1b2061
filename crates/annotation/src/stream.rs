use crate::live::LiveAnnotator;
use crate::metrics::AnnotationMetrics;
use crate::pipeline::{AnnotationPipeline, RunGuard};
use crate::AnnotationError;
use capture::{CaptureError, FrameSource};
use schema::Detection;
use std::path::Path;
use std::time::Instant;
use tokio::sync::mpsc;

/// Open a stored video and stream per-frame detections.
///
/// The producer runs on the blocking pool and waits when the channel is full;
/// it stops at end of stream or within one frame of the receiver being
/// dropped. The examination is held busy for the producer's lifetime.
pub async fn spawn_frame_stream(
    pipeline: &AnnotationPipeline,
    examination_id: &str,
    source_path: &Path,
    capacity: usize,
) -> Result<mpsc::Receiver<Vec<Detection>>, AnnotationError> {
    if pipeline.store().examination(examination_id).await?.is_none() {
        return Err(AnnotationError::NotFound(examination_id.to_string()));
    }
    let guard = pipeline.begin_run(examination_id)?;

    let backend = pipeline.backend().clone();
    let path = source_path.to_path_buf();
    let source = open_on_pool(move || backend.open_source(&path))
        .await?
        .map_err(AnnotationError::invalid_input)?;

    Ok(start_producer(pipeline, examination_id, source, "stream", capacity, Some(guard)))
}

/// Open the live camera `camera` (index, URL or path) and stream per-frame
/// detections until the camera stops producing frames or the receiver is
/// dropped. Live streams do not hold the examination busy.
pub async fn spawn_camera_stream(
    pipeline: &AnnotationPipeline,
    examination_id: &str,
    camera: &str,
    capacity: usize,
) -> Result<mpsc::Receiver<Vec<Detection>>, AnnotationError> {
    if pipeline.store().examination(examination_id).await?.is_none() {
        return Err(AnnotationError::NotFound(examination_id.to_string()));
    }

    let backend = pipeline.backend().clone();
    let camera = camera.to_string();
    let source = open_on_pool(move || backend.open_live(&camera))
        .await?
        .map_err(|e| AnnotationError::SourceUnavailable(e.to_string()))?;

    Ok(start_producer(pipeline, examination_id, source, "camera", capacity, None))
}

async fn open_on_pool<F>(
    open: F,
) -> Result<Result<Box<dyn FrameSource>, CaptureError>, AnnotationError>
where
    F: FnOnce() -> Result<Box<dyn FrameSource>, CaptureError> + Send + 'static,
{
    tokio::task::spawn_blocking(open)
        .await
        .map_err(|e| AnnotationError::Processing(format!("open task failed: {}", e)))
}

fn start_producer(
    pipeline: &AnnotationPipeline,
    examination_id: &str,
    source: Box<dyn FrameSource>,
    mode: &'static str,
    capacity: usize,
    guard: Option<RunGuard>,
) -> mpsc::Receiver<Vec<Detection>> {
    let annotator = LiveAnnotator::new(
        examination_id,
        pipeline.detector().clone(),
        pipeline.clock().clone(),
        mode,
    );

    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::task::spawn_blocking(move || produce(source, annotator, mode, tx, guard));
    rx
}

fn produce(
    mut source: Box<dyn FrameSource>,
    mut annotator: LiveAnnotator,
    mode: &'static str,
    tx: mpsc::Sender<Vec<Detection>>,
    _guard: Option<RunGuard>,
) {
    let metrics = AnnotationMetrics::new();
    let mut frames = 0u64;

    while !tx.is_closed() {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(frames, error = %e, "Unreadable frame, ending stream");
                break;
            }
        };

        let started = Instant::now();
        let detections = annotator.annotate(&frame.image);
        metrics.record_frame(mode, detections.len(), started.elapsed().as_secs_f64());

        if tx.blocking_send(detections).is_err() {
            break;
        }
        frames += 1;
    }

    tracing::info!(
        examination_id = annotator.examination_id(),
        mode,
        frames,
        "Frame stream finished"
    );
}
