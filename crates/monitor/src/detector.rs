use crate::config::MonitorConfig;
use crate::similarity::{SimilarityMetric, to_gray};
use crate::state_machine::{FreezeContext, FreezeState};
use image::{GrayImage, RgbImage};

/// Frame comparison core: keeps the previous sample in grayscale and feeds
/// each comparison into a debounced [`FreezeContext`].
#[derive(Debug)]
pub struct FreezeDetector {
    metric: SimilarityMetric,
    threshold: u32,
    previous: Option<GrayImage>,
    context: FreezeContext,
}

impl FreezeDetector {
    pub fn new(metric: SimilarityMetric, threshold: u32) -> Self {
        Self {
            metric,
            threshold,
            previous: None,
            context: FreezeContext::new(),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.metric, config.frame_threshold)
    }

    /// Compare `frame` with the previous sample and report a transition.
    /// The first frame only becomes the reference.
    pub fn observe(&mut self, frame: &RgbImage) -> Option<FreezeState> {
        let gray = to_gray(frame);
        let transition = self.previous.as_ref().and_then(|previous| {
            let similar = self.metric.is_similar(previous, &gray);
            self.context.update(similar, self.threshold)
        });
        self.previous = Some(gray);
        transition
    }

    pub fn is_frozen(&self) -> bool {
        self.context.is_frozen()
    }

    pub fn state(&self) -> FreezeState {
        self.context.current_state()
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.context = FreezeContext::new();
    }
}
