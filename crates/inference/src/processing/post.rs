use crate::ClassLabels;
use ndarray::ArrayViewD;
use preprocess::LetterboxTransform;
use schema::BoundingBoxDetection;

pub struct PostProcessor {
    pub confidence_threshold: f32,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
        }
    }

    /// Decode DETR query outputs into labeled boxes in source-frame pixels.
    #[tracing::instrument(skip_all)]
    pub fn parse_detections(
        &self,
        dets: &ArrayViewD<f32>,   // [1, Q, 4] - boxes in cxcywh format (normalized 0-1)
        logits: &ArrayViewD<f32>, // [1, Q, C] - class logits, index 0 = background
        transform: &LetterboxTransform,
        labels: &ClassLabels,
    ) -> anyhow::Result<Vec<BoundingBoxDetection>> {
        let (dets_shape, logits_shape) = (dets.shape(), logits.shape());
        if dets_shape.len() != 3 || dets_shape[2] != 4 {
            anyhow::bail!("Unexpected box output shape {:?}", dets_shape);
        }
        if logits_shape.len() != 3 || logits_shape[1] != dets_shape[1] || logits_shape[2] < 2 {
            anyhow::bail!(
                "Logit shape {:?} does not match box shape {:?}",
                logits_shape,
                dets_shape
            );
        }

        let num_queries = dets_shape[1];
        let num_classes = logits_shape[2];
        let mut detections = Vec::new();

        for i in 0..num_queries {
            // Argmax over real classes; index 0 is background
            let mut max_logit = f32::NEG_INFINITY;
            let mut class_idx = 1usize;
            for c in 1..num_classes {
                let logit = logits[[0, i, c]];
                if logit > max_logit {
                    max_logit = logit;
                    class_idx = c;
                }
            }

            let confidence = sigmoid(max_logit);
            if confidence < self.confidence_threshold {
                continue;
            }

            let (x1n, y1n, x2n, y2n) = cxcywh_to_xyxy(
                dets[[0, i, 0]],
                dets[[0, i, 1]],
                dets[[0, i, 2]],
                dets[[0, i, 3]],
            );

            let (iw, ih) = (transform.input_width as f32, transform.input_height as f32);
            let (x1, y1) = transform.to_original(x1n * iw, y1n * ih);
            let (x2, y2) = transform.to_original(x2n * iw, y2n * ih);

            detections.push(BoundingBoxDetection::new(
                x1,
                y1,
                x2,
                y2,
                labels.name(class_idx - 1),
                confidence,
            ));
        }

        Ok(detections)
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    (cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
}
