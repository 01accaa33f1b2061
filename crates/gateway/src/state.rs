use crate::config::GatewayConfig;
use annotation::AnnotationPipeline;
use monitor::{FreezeDetector, FreezeMonitor};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub pipeline: AnnotationPipeline,
    pub monitor: Arc<FreezeMonitor>,
    /// Comparison state for clients that push their own frames.
    pub frame_detector: Arc<Mutex<FreezeDetector>>,
}

impl AppState {
    pub fn new(config: GatewayConfig, pipeline: AnnotationPipeline, monitor: FreezeMonitor) -> Self {
        let frame_detector = FreezeDetector::from_config(monitor.config());
        Self {
            config: Arc::new(config),
            pipeline,
            monitor: Arc::new(monitor),
            frame_detector: Arc::new(Mutex::new(frame_detector)),
        }
    }
}
