use crate::config::MonitorConfig;
use crate::detector::FreezeDetector;
use crate::error::MonitorError;
use crate::metrics::MonitorMetrics;
use crate::state_machine::FreezeState;
use crate::subscribers::{SubscriberId, Subscribers, deliver};
use capture::{CaptureError, FrameSource, VideoBackend, encode_screenshot};
use common::span_debug;
use image::RgbImage;
use schema::FreezeStatus;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc as async_mpsc;

/// Opens the live source each time the monitor starts.
pub type SourceOpener =
    Arc<dyn Fn() -> Result<Box<dyn FrameSource>, CaptureError> + Send + Sync>;

struct BroadcastState {
    frozen: bool,
    last_screenshot: Option<String>,
    subscribers: Subscribers,
}

struct Shared {
    state: Mutex<BroadcastState>,
    running: AtomicBool,
    metrics: MonitorMetrics,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BroadcastState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `status` as the broadcast state, then deliver it outside the lock.
    fn publish(&self, status: FreezeStatus) {
        let targets = {
            let mut state = self.lock();
            state.frozen = status.freeze;
            state.last_screenshot = status.screenshot.clone();
            state.subscribers.snapshot()
        };

        let failed = deliver(targets, &status);
        if !failed.is_empty() {
            let mut state = self.lock();
            for id in failed {
                state.subscribers.remove(id);
            }
        }
    }
}

struct Worker {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Samples a live feed on a background thread and broadcasts freeze state
/// changes to subscribers.
pub struct FreezeMonitor {
    config: MonitorConfig,
    opener: SourceOpener,
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl FreezeMonitor {
    pub fn new(config: MonitorConfig, opener: SourceOpener) -> Self {
        Self {
            config,
            opener,
            shared: Arc::new(Shared {
                state: Mutex::new(BroadcastState {
                    frozen: false,
                    last_screenshot: None,
                    subscribers: Subscribers::default(),
                }),
                running: AtomicBool::new(false),
                metrics: MonitorMetrics::new(),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Monitor whose source is `config.source` opened through `backend`.
    pub fn with_backend(config: MonitorConfig, backend: Arc<dyn VideoBackend>) -> Self {
        let source = config.source.clone();
        let opener: SourceOpener = Arc::new(move || backend.open_live(&source));
        Self::new(config, opener)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Open the source, read the reference frame and launch the sampling
    /// loop. No-op while already running.
    pub fn start(&self) -> Result<(), MonitorError> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if self.shared.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        // Loop that ended on its own (source exhausted)
        if let Some(stale) = worker.take() {
            join(stale.handle);
        }

        let mut source =
            (self.opener)().map_err(|e| MonitorError::SourceUnavailable(e.to_string()))?;
        let first = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                return Err(MonitorError::SourceUnavailable(
                    "source produced no frame".to_string(),
                ));
            }
            Err(e) => return Err(MonitorError::SourceUnavailable(e.to_string())),
        };

        let mut detector = FreezeDetector::from_config(&self.config);
        detector.observe(&first.image);

        if self.shared.lock().frozen {
            self.shared.publish(FreezeStatus::default());
        }

        let (stop_tx, stop_rx) = mpsc::channel();
        let sampling = SamplingLoop {
            source,
            detector,
            stop_rx,
            interval: self.config.sample_interval,
            screenshot_dir: self.config.screenshot_dir.clone(),
            shared: self.shared.clone(),
        };

        self.shared.running.store(true, Ordering::SeqCst);
        let handle = thread::Builder::new()
            .name("freeze-monitor".to_string())
            .spawn(move || sampling.run())
            .inspect_err(|_| self.shared.running.store(false, Ordering::SeqCst))?;

        *worker = Some(Worker { stop_tx, handle });
        tracing::info!(
            source = %self.config.source,
            metric = self.config.metric.name(),
            threshold = self.config.frame_threshold,
            interval_ms = self.config.sample_interval.as_millis() as u64,
            "Freeze monitor started"
        );
        Ok(())
    }

    /// Signal the loop and wait until it has exited and released the source.
    pub fn stop(&self) {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(w) = worker.take() {
            let _ = w.stop_tx.send(());
            join(w.handle);
            tracing::info!("Freeze monitor stopped");
        }
        self.shared.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Last broadcast state; valid whether or not the loop runs.
    pub fn status(&self) -> FreezeStatus {
        let state = self.shared.lock();
        FreezeStatus {
            freeze: state.frozen,
            screenshot: state.last_screenshot.clone(),
        }
    }

    pub fn subscribe(&self) -> (SubscriberId, async_mpsc::Receiver<FreezeStatus>) {
        self.shared
            .lock()
            .subscribers
            .register(self.config.subscriber_capacity)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.shared.lock().subscribers.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }
}

impl Drop for FreezeMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn join(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::error!("Freeze sampling thread panicked");
    }
}

struct SamplingLoop {
    source: Box<dyn FrameSource>,
    detector: FreezeDetector,
    stop_rx: mpsc::Receiver<()>,
    interval: Duration,
    screenshot_dir: Option<PathBuf>,
    shared: Arc<Shared>,
}

impl SamplingLoop {
    fn run(mut self) {
        let mut samples = 0u64;

        loop {
            match self.stop_rx.recv_timeout(self.interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }

            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!(samples, "Live source ended, freeze monitor exiting");
                    break;
                }
                Err(e) => {
                    tracing::warn!(samples, error = %e, "Live frame read failed, freeze monitor exiting");
                    break;
                }
            };

            let _s = span_debug!("freeze_sample");
            samples += 1;
            self.shared.metrics.record_sample();

            if let Some(state) = self.detector.observe(&frame.image) {
                self.on_transition(state, &frame.image);
            }
        }

        drop(self.source);
        self.shared.running.store(false, Ordering::SeqCst);
    }

    fn on_transition(&self, state: FreezeState, frame: &RgbImage) {
        let status = match state {
            FreezeState::Frozen => {
                if let Some(dir) = &self.screenshot_dir {
                    save_screenshot(dir, frame);
                }
                let screenshot = encode_screenshot(frame)
                    .inspect_err(|e| tracing::warn!(error = %e, "Cannot encode freeze screenshot"))
                    .ok();
                FreezeStatus {
                    freeze: true,
                    screenshot,
                }
            }
            FreezeState::Live => FreezeStatus::default(),
        };

        tracing::info!(state = ?state, "Freeze state changed");
        self.shared.metrics.record_transition(state);
        self.shared.publish(status);
    }
}

fn save_screenshot(dir: &Path, frame: &RgbImage) {
    let path = dir.join(format!(
        "freeze_{}.jpg",
        chrono::Utc::now().timestamp_millis()
    ));
    let saved = std::fs::create_dir_all(dir)
        .map_err(|e| e.to_string())
        .and_then(|_| frame.save(&path).map_err(|e| e.to_string()));

    match saved {
        Ok(()) => tracing::info!(path = %path.display(), "Freeze screenshot saved"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Cannot save freeze screenshot"),
    }
}
