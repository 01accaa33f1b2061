use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};

#[derive(Clone)]
pub struct AnnotationMetrics {
    frames: Counter<u64>,
    detections: Counter<u64>,
    detector_failures: Counter<u64>,
    frame_duration: Histogram<f64>,
}

impl AnnotationMetrics {
    pub fn new() -> Self {
        let meter = global::meter("annotation");
        let latency_buckets = [
            0.005, 0.01, 0.02, 0.03, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 1.0, 2.0,
        ];

        Self {
            frames: meter
                .u64_counter("annotation_frames_total")
                .with_description("Frames read and written by annotation runs")
                .build(),
            detections: meter
                .u64_counter("annotation_detections_total")
                .with_description("Detections recorded by annotation runs")
                .build(),
            detector_failures: meter
                .u64_counter("annotation_detector_failures_total")
                .with_description("Frames written unannotated after a detector error")
                .build(),
            frame_duration: meter
                .f64_histogram("annotation_frame_duration_seconds")
                .with_description("Time to detect, draw and write one frame")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
        }
    }

    pub fn record_frame(&self, mode: &'static str, detections: usize, seconds: f64) {
        let attrs = [KeyValue::new("mode", mode)];
        self.frames.add(1, &attrs);
        self.detections.add(detections as u64, &attrs);
        self.frame_duration.record(seconds, &attrs);
    }

    pub fn record_detector_failure(&self, mode: &'static str) {
        self.detector_failures.add(1, &[KeyValue::new("mode", mode)]);
    }
}

impl Default for AnnotationMetrics {
    fn default() -> Self {
        Self::new()
    }
}
