use ndarray::{Array, IxDyn};

#[cfg(feature = "ort-backend")]
pub mod ort;

pub trait InferenceBackend: Send {
    /// Run inference on a `[1, 3, H, W]` normalized input.
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;
}

pub struct InferenceOutput {
    pub dets: ndarray::ArrayD<f32>,   // [1, Q, 4] cxcywh (normalized 0-1)
    pub logits: ndarray::ArrayD<f32>, // [1, Q, num_classes] class logits
}
