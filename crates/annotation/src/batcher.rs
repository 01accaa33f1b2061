use schema::Detection;
use std::sync::Arc;
use store::{DetectionStore, StoreError};

/// Buffers streamed detections and commits them every `batch_frames`
/// frames, so a dropped connection loses at most the unflushed tail.
pub struct DetectionBatcher {
    store: Arc<dyn DetectionStore>,
    examination_id: String,
    batch_frames: usize,
    pending: Vec<Detection>,
    pending_frames: usize,
    committed: u64,
}

impl DetectionBatcher {
    pub fn new(store: Arc<dyn DetectionStore>, examination_id: &str, batch_frames: usize) -> Self {
        Self {
            store,
            examination_id: examination_id.to_string(),
            batch_frames: batch_frames.max(1),
            pending: Vec::new(),
            pending_frames: 0,
            committed: 0,
        }
    }

    /// Add one frame's detections, flushing when the batch is full.
    pub async fn push_frame(&mut self, detections: &[Detection]) -> Result<(), StoreError> {
        self.pending.extend_from_slice(detections);
        self.pending_frames += 1;
        if self.pending_frames >= self.batch_frames {
            self.flush().await?;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), StoreError> {
        self.pending_frames = 0;
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        self.committed += self
            .store
            .insert_detections(&self.examination_id, &batch)
            .await?;
        Ok(())
    }

    /// Flush the tail and report the total number of committed detections.
    pub async fn close(mut self) -> Result<u64, StoreError> {
        self.flush().await?;
        Ok(self.committed)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
