//! A "video" stored as a directory of numbered image files.
//!
//! Frames are read in file-name order; the annotated output is a sibling
//! directory of `frame_000000.png` files.

use crate::{CaptureError, Frame, FrameSink, FrameSource, VideoBackend, VideoProperties, decode_image};
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Clone)]
pub struct ImageSequenceBackend {
    fps: f64,
}

impl ImageSequenceBackend {
    pub fn new(fps: f64) -> Self {
        Self { fps }
    }
}

impl VideoBackend for ImageSequenceBackend {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>, CaptureError> {
        Ok(Box::new(ImageSequenceSource::open(path, self.fps)?))
    }

    fn open_live(&self, source: &str) -> Result<Box<dyn FrameSource>, CaptureError> {
        self.open_source(Path::new(source))
    }

    fn open_sink(
        &self,
        path: &Path,
        properties: &VideoProperties,
    ) -> Result<Box<dyn FrameSink>, CaptureError> {
        Ok(Box::new(ImageSequenceSink::create(path, *properties)?))
    }

    fn output_extension(&self, _source: &Path) -> String {
        String::new()
    }
}

pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    properties: VideoProperties,
    first: Option<RgbImage>,
    position: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path, fps: f64) -> Result<Self, CaptureError> {
        let open_err = |reason: String| CaptureError::OpenSource {
            path: dir.display().to_string(),
            reason,
        };

        let entries = fs::read_dir(dir).map_err(|e| open_err(e.to_string()))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_frame_file(p))
            .collect();
        files.sort();

        let first_path = files
            .first()
            .ok_or_else(|| open_err("no frames found".to_string()))?;
        let bytes = fs::read(first_path).map_err(|e| open_err(e.to_string()))?;
        let first = decode_image(&bytes).map_err(|e| open_err(e.to_string()))?;

        tracing::debug!(
            path = %dir.display(),
            frames = files.len(),
            width = first.width(),
            height = first.height(),
            "Opened image sequence"
        );

        Ok(Self {
            properties: VideoProperties {
                width: first.width(),
                height: first.height(),
                fps,
            },
            files,
            first: Some(first),
            position: 0,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn properties(&self) -> VideoProperties {
        self.properties
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let index = self.position as u64;
        let image = if let Some(first) = self.first.take() {
            first
        } else {
            let Some(path) = self.files.get(self.position) else {
                return Ok(None);
            };
            let bytes = fs::read(path).map_err(|e| CaptureError::Read {
                index,
                reason: e.to_string(),
            })?;
            decode_image(&bytes).map_err(|e| CaptureError::Read {
                index,
                reason: e.to_string(),
            })?
        };

        if image.dimensions() != (self.properties.width, self.properties.height) {
            return Err(CaptureError::Read {
                index,
                reason: format!(
                    "frame is {}x{}, stream is {}x{}",
                    image.width(),
                    image.height(),
                    self.properties.width,
                    self.properties.height
                ),
            });
        }

        self.position += 1;
        Ok(Some(Frame::new(image, index, self.properties.fps)))
    }
}

pub struct ImageSequenceSink {
    dir: PathBuf,
    properties: VideoProperties,
    written: u64,
}

impl ImageSequenceSink {
    /// Frames left in `dir` by an earlier writer are discarded.
    pub fn create(dir: &Path, properties: VideoProperties) -> Result<Self, CaptureError> {
        let sink_err = |e: std::io::Error| CaptureError::OpenSink {
            path: dir.display().to_string(),
            reason: e.to_string(),
        };
        if dir.exists() {
            fs::remove_dir_all(dir).map_err(sink_err)?;
        }
        fs::create_dir_all(dir).map_err(sink_err)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            properties,
            written: 0,
        })
    }
}

impl FrameSink for ImageSequenceSink {
    fn write(&mut self, image: &RgbImage) -> Result<(), CaptureError> {
        if image.dimensions() != (self.properties.width, self.properties.height) {
            return Err(CaptureError::FrameSize {
                width: self.properties.width,
                height: self.properties.height,
                actual_width: image.width(),
                actual_height: image.height(),
            });
        }

        let path = self.dir.join(format!("frame_{:06}.png", self.written));
        image.save(&path).map_err(|e| CaptureError::Write {
            index: self.written,
            reason: e.to_string(),
        })?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<u64, CaptureError> {
        Ok(self.written)
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}
