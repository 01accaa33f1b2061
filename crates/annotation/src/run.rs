use crate::AnnotationError;
use capture::VideoProperties;
use schema::Detection;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Opened,
    Streaming,
    Finalizing,
    Done,
    Aborted,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Aborted)
    }
}

/// Bookkeeping for one pass over one source video: where it reads from and
/// writes to, and the detections accumulated so far.
#[derive(Debug)]
pub struct AnnotationRun {
    state: RunState,
    examination_id: String,
    source_path: PathBuf,
    output_path: PathBuf,
    properties: Option<VideoProperties>,
    detections: Vec<Detection>,
    frames: u64,
}

impl AnnotationRun {
    pub fn new(examination_id: &str, source_path: &Path, output_path: &Path) -> Self {
        Self {
            state: RunState::Idle,
            examination_id: examination_id.to_string(),
            source_path: source_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
            properties: None,
            detections: Vec::new(),
            frames: 0,
        }
    }

    /// Source and writer acquired.
    pub fn opened(&mut self, properties: VideoProperties) -> Result<(), AnnotationError> {
        self.transition(RunState::Opened, &[RunState::Idle])?;
        self.properties = Some(properties);
        Ok(())
    }

    /// One frame went through detection and was written.
    pub fn record_frame(&mut self, detections: Vec<Detection>) -> Result<(), AnnotationError> {
        self.transition(RunState::Streaming, &[RunState::Opened, RunState::Streaming])?;
        self.frames += 1;
        self.detections.extend(detections);
        Ok(())
    }

    /// End of stream reached.
    pub fn finalize(&mut self) -> Result<(), AnnotationError> {
        self.transition(RunState::Finalizing, &[RunState::Opened, RunState::Streaming])
    }

    /// Output closed; hands over the accumulated detections for commit.
    pub fn complete(&mut self) -> Result<Vec<Detection>, AnnotationError> {
        self.transition(RunState::Done, &[RunState::Finalizing])?;
        Ok(std::mem::take(&mut self.detections))
    }

    /// Discard the accumulator. No-op once terminal.
    pub fn abort(&mut self, reason: &str) {
        if self.state.is_terminal() {
            return;
        }
        tracing::warn!(
            examination_id = %self.examination_id,
            source = %self.source_path.display(),
            from = ?self.state,
            frames = self.frames,
            reason,
            "Annotation run aborted"
        );
        self.state = RunState::Aborted;
        self.detections.clear();
    }

    fn transition(&mut self, to: RunState, allowed_from: &[RunState]) -> Result<(), AnnotationError> {
        if !allowed_from.contains(&self.state) {
            return Err(AnnotationError::Processing(format!(
                "invalid run transition {:?} -> {:?}",
                self.state, to
            )));
        }
        if self.state != to {
            tracing::debug!(from = ?self.state, to = ?to, "Run state transition");
        }
        self.state = to;
        Ok(())
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn detection_count(&self) -> usize {
        self.detections.len()
    }

    pub fn properties(&self) -> Option<VideoProperties> {
        self.properties
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}
