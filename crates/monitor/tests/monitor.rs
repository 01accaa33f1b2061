use capture::{CaptureError, Frame, FrameSource, VideoProperties, decode_base64_image};
use image::{Rgb, RgbImage};
use monitor::{FreezeMonitor, MonitorConfig, MonitorError, SimilarityMetric, SourceOpener};
use schema::FreezeStatus;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const W: u32 = 32;
const H: u32 = 24;

fn solid(value: u8) -> RgbImage {
    RgbImage::from_pixel(W, H, Rgb([value, value, value]))
}

/// Plays back a fixed list of frames, optionally repeating the last forever.
struct ScriptedSource {
    frames: VecDeque<RgbImage>,
    hold_last: Option<RgbImage>,
    index: u64,
    released: Arc<AtomicUsize>,
}

impl FrameSource for ScriptedSource {
    fn properties(&self) -> VideoProperties {
        VideoProperties {
            width: W,
            height: H,
            fps: 30.0,
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let image = match self.frames.pop_front() {
            Some(image) => image,
            None => match &self.hold_last {
                Some(image) => image.clone(),
                None => return Ok(None),
            },
        };
        let frame = Frame::new(image, self.index, 30.0);
        self.index += 1;
        Ok(Some(frame))
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

struct Script {
    opens: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl Script {
    fn opener(&self, frames: Vec<RgbImage>, endless: bool) -> SourceOpener {
        let opens = self.opens.clone();
        let released = self.released.clone();
        Arc::new(move || {
            opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedSource {
                hold_last: if endless { frames.last().cloned() } else { None },
                frames: frames.clone().into(),
                index: 0,
                released: released.clone(),
            }) as Box<dyn FrameSource>)
        })
    }
}

fn script() -> Script {
    Script {
        opens: Arc::new(AtomicUsize::new(0)),
        released: Arc::new(AtomicUsize::new(0)),
    }
}

fn config(threshold: u32) -> MonitorConfig {
    MonitorConfig {
        source: "scripted".to_string(),
        sample_interval: Duration::from_millis(5),
        frame_threshold: threshold,
        metric: SimilarityMetric::PixelDiff {
            max_changed_pixels: 100,
        },
        screenshot_dir: None,
        subscriber_capacity: 16,
    }
}

fn wait_until_stopped(monitor: &FreezeMonitor) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while monitor.is_running() {
        assert!(Instant::now() < deadline, "sampling loop did not exit");
        thread::sleep(Duration::from_millis(5));
    }
}

fn drain(rx: &mut tokio::sync::mpsc::Receiver<FreezeStatus>) -> Vec<FreezeStatus> {
    let mut out = Vec::new();
    while let Ok(status) = rx.try_recv() {
        out.push(status);
    }
    out
}

// ========== Broadcast Sequence Tests ==========

#[test]
fn identical_then_changed_frames_broadcast_only_transitions() {
    let s = script();
    let frames = vec![solid(10), solid(10), solid(200), solid(90), solid(90)];
    let monitor = FreezeMonitor::new(config(1), s.opener(frames, false));
    let (_, mut rx) = monitor.subscribe();

    monitor.start().unwrap();
    wait_until_stopped(&monitor);

    let events = drain(&mut rx);
    let flags: Vec<bool> = events.iter().map(|e| e.freeze).collect();
    assert_eq!(flags, vec![true, false, true]);

    let shot = decode_base64_image(events[0].screenshot.as_deref().unwrap()).unwrap();
    assert_eq!(shot.dimensions(), (W, H));
    assert!(events[1].screenshot.is_none());
    assert!(events[2].screenshot.is_some());
}

#[test]
fn sustained_freeze_broadcasts_once() {
    let s = script();
    let mut frames = vec![solid(10), solid(60), solid(120)];
    frames.extend(std::iter::repeat_n(solid(200), 20));
    let monitor = FreezeMonitor::new(config(3), s.opener(frames, false));
    let (_, mut rx) = monitor.subscribe();

    monitor.start().unwrap();
    wait_until_stopped(&monitor);

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(events[0].freeze);

    let status = monitor.status();
    assert!(status.freeze);
    assert_eq!(status.screenshot, events[0].screenshot);
}

#[test]
fn status_is_readable_before_start() {
    let s = script();
    let monitor = FreezeMonitor::new(config(1), s.opener(vec![solid(1)], false));

    assert_eq!(monitor.status(), FreezeStatus::default());
    assert!(!monitor.is_running());
}

// ========== Lifecycle Tests ==========

#[test]
fn stop_joins_and_restart_reopens_source() {
    let s = script();
    let monitor = FreezeMonitor::new(config(3), s.opener(vec![solid(10), solid(50)], true));

    monitor.start().unwrap();
    assert!(monitor.is_running());
    thread::sleep(Duration::from_millis(30));

    monitor.stop();
    assert!(!monitor.is_running());
    assert_eq!(s.released.load(Ordering::SeqCst), 1, "source released before stop returns");

    monitor.start().unwrap();
    assert!(monitor.is_running());
    assert_eq!(s.opens.load(Ordering::SeqCst), 2);

    monitor.stop();
    assert_eq!(s.released.load(Ordering::SeqCst), 2);
}

#[test]
fn start_and_stop_are_idempotent() {
    let s = script();
    let monitor = FreezeMonitor::new(config(3), s.opener(vec![solid(10)], true));

    monitor.stop();
    monitor.start().unwrap();
    monitor.start().unwrap();
    assert_eq!(s.opens.load(Ordering::SeqCst), 1);

    monitor.stop();
    monitor.stop();
    assert!(!monitor.is_running());
}

#[test]
fn exhausted_source_stops_loop_and_allows_restart() {
    let s = script();
    let monitor = FreezeMonitor::new(config(3), s.opener(vec![solid(10), solid(20)], false));

    monitor.start().unwrap();
    wait_until_stopped(&monitor);
    assert_eq!(s.released.load(Ordering::SeqCst), 1);

    monitor.start().unwrap();
    assert_eq!(s.opens.load(Ordering::SeqCst), 2);
    wait_until_stopped(&monitor);
}

#[test]
fn restart_after_freeze_announces_live() {
    let s = script();
    let mut cfg = config(1);
    // Long enough that the second run cannot sample before the asserts
    cfg.sample_interval = Duration::from_millis(500);
    let monitor = FreezeMonitor::new(cfg, s.opener(vec![solid(10), solid(10)], false));
    let (_, mut rx) = monitor.subscribe();

    monitor.start().unwrap();
    wait_until_stopped(&monitor);
    assert!(monitor.status().freeze);
    drain(&mut rx);

    monitor.start().unwrap();
    assert_eq!(monitor.status(), FreezeStatus::default());
    assert_eq!(rx.try_recv().unwrap(), FreezeStatus::default());
    monitor.stop();
}

// ========== Source Failure Tests ==========

#[test]
fn unopenable_source_leaves_monitor_stopped() {
    let opener: SourceOpener = Arc::new(|| {
        Err(CaptureError::OpenSource {
            path: "0".to_string(),
            reason: "no camera".to_string(),
        })
    });
    let monitor = FreezeMonitor::new(config(1), opener);

    let err = monitor.start().unwrap_err();

    assert!(matches!(err, MonitorError::SourceUnavailable(ref m) if m.contains("no camera")));
    assert!(!monitor.is_running());
}

#[test]
fn source_without_first_frame_is_unavailable() {
    let s = script();
    let monitor = FreezeMonitor::new(config(1), s.opener(Vec::new(), false));

    assert!(matches!(
        monitor.start(),
        Err(MonitorError::SourceUnavailable(_))
    ));
    assert!(!monitor.is_running());
    assert_eq!(s.released.load(Ordering::SeqCst), 1);
}

// ========== Subscriber Tests ==========

#[test]
fn closed_subscriber_is_evicted_others_still_served() {
    let s = script();
    let monitor = FreezeMonitor::new(config(1), s.opener(vec![solid(10), solid(10)], false));
    let (_, gone) = monitor.subscribe();
    let (_, mut kept) = monitor.subscribe();
    drop(gone);

    monitor.start().unwrap();
    wait_until_stopped(&monitor);

    assert_eq!(drain(&mut kept).len(), 1);
    assert_eq!(monitor.subscriber_count(), 1);
}

#[test]
fn unsubscribe_removes_listener() {
    let s = script();
    let monitor = FreezeMonitor::new(config(1), s.opener(vec![solid(10)], false));
    let (id, _rx) = monitor.subscribe();

    assert!(monitor.unsubscribe(id));
    assert!(!monitor.unsubscribe(id));
    assert_eq!(monitor.subscriber_count(), 0);
}

#[test]
fn freeze_screenshot_written_to_directory() {
    let dir = tempfile::tempdir().unwrap();
    let s = script();
    let mut cfg = config(1);
    cfg.screenshot_dir = Some(dir.path().join("shots"));
    let monitor = FreezeMonitor::new(cfg, s.opener(vec![solid(10), solid(10)], false));

    monitor.start().unwrap();
    wait_until_stopped(&monitor);

    let names: Vec<String> = std::fs::read_dir(dir.path().join("shots"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("freeze_") && names[0].ends_with(".jpg"));
}
