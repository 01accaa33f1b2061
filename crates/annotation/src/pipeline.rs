use crate::clock::{Clock, SystemClock};
use crate::live::LiveAnnotator;
use crate::metrics::AnnotationMetrics;
use crate::overlay::Overlay;
use crate::run::AnnotationRun;
use crate::AnnotationError;
use capture::{FrameSink, FrameSource, VideoBackend};
use common::span;
use inference::SharedDetector;
use schema::{AnnotationResult, Detection};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use store::DetectionStore;

/// Annotates stored videos of an examination: every frame goes through the
/// detector, boxes are drawn on a copy written to `<stem>_detection.<ext>`
/// in the examination folder, and the detections are committed in one
/// transaction once the whole video has been written.
///
/// A run writes to `<stem>_detection.partial<.ext>` and only replaces the
/// previous output once its detections are committed.
#[derive(Clone)]
pub struct AnnotationPipeline {
    store: Arc<dyn DetectionStore>,
    backend: Arc<dyn VideoBackend>,
    detector: SharedDetector,
    overlay: Arc<Overlay>,
    clock: Arc<dyn Clock>,
    active: Arc<Mutex<HashSet<String>>>,
}

impl AnnotationPipeline {
    pub fn new(
        store: Arc<dyn DetectionStore>,
        backend: Arc<dyn VideoBackend>,
        detector: SharedDetector,
        overlay: Overlay,
    ) -> Self {
        Self {
            store,
            backend,
            detector,
            overlay: Arc::new(overlay),
            clock: Arc::new(SystemClock),
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn DetectionStore> {
        &self.store
    }

    pub fn backend(&self) -> &Arc<dyn VideoBackend> {
        &self.backend
    }

    pub fn detector(&self) -> &SharedDetector {
        &self.detector
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Claim `examination_id` for one run; released when the guard drops.
    pub(crate) fn begin_run(&self, examination_id: &str) -> Result<RunGuard, AnnotationError> {
        RunGuard::acquire(&self.active, examination_id)
    }

    #[tracing::instrument(skip(self, source_path), fields(source = %source_path.display()))]
    pub async fn process_video(
        &self,
        examination_id: &str,
        source_path: &Path,
    ) -> Result<AnnotationResult, AnnotationError> {
        let examination = self
            .store
            .examination(examination_id)
            .await?
            .ok_or_else(|| AnnotationError::NotFound(examination_id.to_string()))?;

        let _guard = self.begin_run(examination_id)?;

        let folder = PathBuf::from(&examination.folder_path);
        let output_path = self.backend.output_path(source_path, &folder);
        let partial_path = sibling_path(&output_path, "partial");

        let job = FrameLoop {
            backend: self.backend.clone(),
            annotator: LiveAnnotator::new(
                examination_id,
                self.detector.clone(),
                self.clock.clone(),
                "video",
            ),
            overlay: self.overlay.clone(),
            metrics: AnnotationMetrics::new(),
            run: AnnotationRun::new(examination_id, source_path, &output_path),
            partial_path: partial_path.clone(),
            folder,
        };

        let detections = tokio::task::spawn_blocking(move || job.run())
            .await
            .map_err(|e| AnnotationError::Processing(format!("annotation task failed: {}", e)))??;

        let published = PublishedOutput::swap_in(&partial_path, &output_path).map_err(|e| {
            remove_output(&partial_path);
            AnnotationError::Processing(format!(
                "cannot move annotated output to {}: {}",
                output_path.display(),
                e
            ))
        })?;

        if let Err(e) = self.store.insert_detections(examination_id, &detections).await {
            published.roll_back();
            return Err(e.into());
        }
        published.keep();

        tracing::info!(
            examination_id,
            output = %output_path.display(),
            detections = detections.len(),
            "Annotation run committed"
        );

        Ok(AnnotationResult {
            annotated_video_filename: output_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            annotated_video_path: output_path.display().to_string(),
            detections,
        })
    }
}

/// Blocking half of a run: owns the source and sink for its whole life so
/// both are released on every exit path.
struct FrameLoop {
    backend: Arc<dyn VideoBackend>,
    annotator: LiveAnnotator,
    overlay: Arc<Overlay>,
    metrics: AnnotationMetrics,
    run: AnnotationRun,
    partial_path: PathBuf,
    folder: PathBuf,
}

impl FrameLoop {
    fn run(mut self) -> Result<Vec<Detection>, AnnotationError> {
        let result = self.drive();

        match result {
            Ok(()) => {
                let detections = self.run.complete()?;
                tracing::info!(
                    frames = self.run.frames(),
                    detections = detections.len(),
                    "Annotated video written"
                );
                Ok(detections)
            }
            Err(e) => {
                self.run.abort(&e.to_string());
                remove_output(&self.partial_path);
                Err(e)
            }
        }
    }

    fn drive(&mut self) -> Result<(), AnnotationError> {
        let source_path = self.run.source_path().to_path_buf();
        let mut source = self
            .backend
            .open_source(&source_path)
            .map_err(AnnotationError::invalid_input)?;
        let properties = source.properties();

        fs::create_dir_all(&self.folder).map_err(|e| {
            AnnotationError::Processing(format!(
                "cannot create examination folder {}: {}",
                self.folder.display(),
                e
            ))
        })?;

        let mut sink = self
            .backend
            .open_sink(&self.partial_path, &properties)
            .map_err(AnnotationError::processing)?;

        self.run.opened(properties)?;
        tracing::info!(
            width = properties.width,
            height = properties.height,
            fps = properties.fps,
            output = %self.run.output_path().display(),
            "Annotation run opened"
        );

        self.stream(source.as_mut(), sink.as_mut())?;
        drop(source);

        sink.finish().map_err(AnnotationError::processing)?;
        self.run.finalize()
    }

    fn stream(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
    ) -> Result<(), AnnotationError> {
        loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) if self.run.frames() == 0 => {
                    return Err(AnnotationError::InvalidInput(format!(
                        "{} contains no decodable frames",
                        self.run.source_path().display()
                    )));
                }
                Ok(None) => return Ok(()),
                Err(e) if self.run.frames() == 0 => return Err(AnnotationError::invalid_input(e)),
                Err(e) => {
                    tracing::warn!(
                        frames = self.run.frames(),
                        error = %e,
                        "Unreadable frame, treating as end of stream"
                    );
                    return Ok(());
                }
            };

            let _s = span!("annotate_frame");
            let started = Instant::now();

            let detections = self.annotator.annotate(&frame.image);
            let written = if detections.is_empty() {
                sink.write(&frame.image)
            } else {
                sink.write(&self.overlay.draw(&frame.image, &detections))
            };
            written.map_err(AnnotationError::processing)?;

            self.metrics.record_frame(
                "video",
                detections.len(),
                started.elapsed().as_secs_f64(),
            );
            self.run.record_frame(detections)?;
        }
    }
}

/// Marks an examination as having a run in flight until dropped.
pub(crate) struct RunGuard {
    active: Arc<Mutex<HashSet<String>>>,
    examination_id: String,
}

impl RunGuard {
    fn acquire(
        active: &Arc<Mutex<HashSet<String>>>,
        examination_id: &str,
    ) -> Result<Self, AnnotationError> {
        let mut set = active
            .lock()
            .map_err(|_| AnnotationError::Processing("run registry poisoned".to_string()))?;
        if !set.insert(examination_id.to_string()) {
            return Err(AnnotationError::Busy(examination_id.to_string()));
        }
        Ok(Self {
            active: active.clone(),
            examination_id: examination_id.to_string(),
        })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.active.lock() {
            set.remove(&self.examination_id);
        }
    }
}

/// Finished output moved onto the final path. The output it replaced is
/// kept aside until the run's detections are committed.
struct PublishedOutput {
    path: PathBuf,
    previous: Option<PathBuf>,
}

impl PublishedOutput {
    fn swap_in(partial: &Path, path: &Path) -> io::Result<Self> {
        let previous = if path.exists() {
            let aside = sibling_path(path, "previous");
            remove_output(&aside);
            fs::rename(path, &aside)?;
            Some(aside)
        } else {
            None
        };

        if let Err(e) = fs::rename(partial, path) {
            if let Some(aside) = &previous {
                restore(aside, path);
            }
            return Err(e);
        }

        Ok(Self {
            path: path.to_path_buf(),
            previous,
        })
    }

    fn keep(self) {
        if let Some(aside) = &self.previous {
            remove_output(aside);
        }
    }

    fn roll_back(self) {
        remove_output(&self.path);
        if let Some(aside) = &self.previous {
            restore(aside, &self.path);
        }
    }
}

fn restore(aside: &Path, path: &Path) {
    if let Err(e) = fs::rename(aside, path) {
        tracing::error!(
            path = %path.display(),
            aside = %aside.display(),
            error = %e,
            "Cannot restore previous annotated output"
        );
    }
}

/// `clip_detection.mp4` -> `clip_detection.<tag>.mp4`, `clip_detection` ->
/// `clip_detection.<tag>`.
fn sibling_path(path: &Path, tag: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}.{}.{}", stem, tag, ext.to_string_lossy()),
        None => format!("{}.{}", stem, tag),
    };
    path.with_file_name(name)
}

fn remove_output(path: &Path) {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed annotated output"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove annotated output"),
    }
}
