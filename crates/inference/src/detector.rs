use crate::{ClassLabels, InferenceBackend, InferenceConfig, processing::PostProcessor};
use common::span_debug;
use image::RgbImage;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};
use preprocess::{CpuPreProcessor, Preprocess};
use schema::BoundingBoxDetection;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Frame-level object detector.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<Vec<BoundingBoxDetection>>;
}

/// One detector instance shared by every run; calls are serialized.
pub type SharedDetector = Arc<Mutex<dyn ObjectDetector>>;

pub fn shared<D: ObjectDetector + 'static>(detector: D) -> SharedDetector {
    Arc::new(Mutex::new(detector))
}

/// Preprocess, infer, decode. Generic over the runtime that executes the
/// model.
pub struct DetrDetector<B: InferenceBackend> {
    backend: B,
    preprocessor: CpuPreProcessor,
    postprocessor: PostProcessor,
    labels: ClassLabels,
    duration_histogram: Histogram<f64>,
    detections_counter: Counter<u64>,
}

impl<B: InferenceBackend> DetrDetector<B> {
    pub fn new(
        backend: B,
        input_size: (u32, u32),
        confidence_threshold: f32,
        labels: ClassLabels,
    ) -> Self {
        let meter = global::meter("inference");
        let duration_histogram = meter
            .f64_histogram("inference_duration_seconds")
            .with_description("Time to process a single frame (preprocess + infer + postprocess)")
            .with_unit("s")
            .with_boundaries(vec![
                0.005, 0.01, 0.02, 0.03, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 1.0,
            ])
            .build();
        let detections_counter = meter
            .u64_counter("inference_detections_total")
            .with_description("Total detections produced")
            .build();

        Self {
            backend,
            preprocessor: CpuPreProcessor::new(input_size),
            postprocessor: PostProcessor::new(confidence_threshold),
            labels,
            duration_histogram,
            detections_counter,
        }
    }
}

impl<B: InferenceBackend> ObjectDetector for DetrDetector<B> {
    fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<Vec<BoundingBoxDetection>> {
        let _s = span_debug!("detect");
        let started = Instant::now();

        let input = self.preprocessor.preprocess(frame)?;
        let output = self.backend.infer(&input.tensor)?;
        let detections = self.postprocessor.parse_detections(
            &output.dets.view(),
            &output.logits.view(),
            &input.transform,
            &self.labels,
        )?;

        self.duration_histogram
            .record(started.elapsed().as_secs_f64(), &[]);
        self.detections_counter.add(detections.len() as u64, &[]);

        Ok(detections)
    }
}

/// Load the configured model. Fails when the crate was built without a
/// runtime backend.
pub fn build_detector(config: &InferenceConfig) -> anyhow::Result<SharedDetector> {
    let labels = match &config.labels_path {
        Some(path) => ClassLabels::from_file(path)?,
        None => ClassLabels::default(),
    };

    #[cfg(feature = "ort-backend")]
    {
        let backend =
            crate::backend::ort::OrtBackend::load_model(&config.model_path, config.execution_provider)?;
        Ok(shared(DetrDetector::new(
            backend,
            config.input_size,
            config.confidence_threshold,
            labels,
        )))
    }

    #[cfg(not(feature = "ort-backend"))]
    {
        let _ = labels;
        anyhow::bail!(
            "No inference runtime compiled in; rebuild with the `ort-backend` feature to load {}",
            config.model_path
        )
    }
}
