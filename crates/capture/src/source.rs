use crate::{CaptureError, Frame, FrameSink, VideoProperties};
use std::path::{Path, PathBuf};

/// Sequential decoder over a stored video or a live device.
///
/// Handles are released when the source is dropped.
pub trait FrameSource: Send {
    fn properties(&self) -> VideoProperties;

    /// `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
}

/// Opens sources and annotated-output writers for one storage format.
pub trait VideoBackend: Send + Sync {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>, CaptureError>;

    /// Open a live source: a camera index, a stream URL or a path.
    fn open_live(&self, source: &str) -> Result<Box<dyn FrameSource>, CaptureError>;

    fn open_sink(
        &self,
        path: &Path,
        properties: &VideoProperties,
    ) -> Result<Box<dyn FrameSink>, CaptureError>;

    /// Output extension including the dot, empty for directory outputs.
    fn output_extension(&self, source: &Path) -> String;

    /// `<dir>/<stem>_detection<ext>` for `source`.
    fn output_path(&self, source: &Path, dir: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        dir.join(format!("{}_detection{}", stem, self.output_extension(source)))
    }
}
