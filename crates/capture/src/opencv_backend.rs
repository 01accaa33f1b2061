use crate::{CaptureError, Frame, FrameSink, FrameSource, VideoBackend, VideoProperties};
use image::RgbImage;
use opencv::{
    core::{AlgorithmHint, Mat, Size},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use std::path::Path;

/// Fallback when a container reports no frame rate.
const DEFAULT_FPS: f64 = 30.0;

/// Container files and cameras through OpenCV's `videoio`.
#[derive(Debug, Default, Clone)]
pub struct OpenCvBackend;

impl OpenCvBackend {
    pub fn new() -> Self {
        Self
    }
}

impl VideoBackend for OpenCvBackend {
    fn open_source(&self, path: &Path) -> Result<Box<dyn FrameSource>, CaptureError> {
        let name = path.to_string_lossy();
        let cap = VideoCapture::from_file(&name, videoio::CAP_ANY)?;
        Ok(Box::new(OpenCvSource::new(cap, &name)?))
    }

    fn open_live(&self, source: &str) -> Result<Box<dyn FrameSource>, CaptureError> {
        let cap = match source.parse::<i32>() {
            Ok(index) => VideoCapture::new(index, videoio::CAP_ANY)?,
            Err(_) => VideoCapture::from_file(source, videoio::CAP_ANY)?,
        };
        Ok(Box::new(OpenCvSource::new(cap, source)?))
    }

    fn open_sink(
        &self,
        path: &Path,
        properties: &VideoProperties,
    ) -> Result<Box<dyn FrameSink>, CaptureError> {
        let name = path.to_string_lossy();
        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let writer = VideoWriter::new(
            &name,
            fourcc,
            properties.fps,
            Size::new(properties.width as i32, properties.height as i32),
            true,
        )?;

        if !writer.is_opened()? {
            return Err(CaptureError::OpenSink {
                path: name.into_owned(),
                reason: "VideoWriter did not open".to_string(),
            });
        }

        Ok(Box::new(OpenCvSink {
            writer,
            properties: *properties,
            written: 0,
        }))
    }

    fn output_extension(&self, _source: &Path) -> String {
        ".mp4".to_string()
    }
}

pub struct OpenCvSource {
    cap: VideoCapture,
    properties: VideoProperties,
    position: u64,
}

impl OpenCvSource {
    fn new(cap: VideoCapture, name: &str) -> Result<Self, CaptureError> {
        if !cap.is_opened()? {
            return Err(CaptureError::OpenSource {
                path: name.to_string(),
                reason: "VideoCapture did not open".to_string(),
            });
        }

        let fps = cap.get(videoio::CAP_PROP_FPS)?;
        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;

        tracing::debug!(source = name, width, height, fps, "Opened OpenCV capture");

        Ok(Self {
            cap,
            properties: VideoProperties {
                width,
                height,
                fps: if fps > 0.0 { fps } else { DEFAULT_FPS },
            },
            position: 0,
        })
    }
}

impl FrameSource for OpenCvSource {
    fn properties(&self) -> VideoProperties {
        self.properties
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let mut bgr = Mat::default();
        if !self.cap.read(&mut bgr)? || bgr.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0, AlgorithmHint::ALGO_HINT_DEFAULT)?;

        let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
        let image = RgbImage::from_raw(width, height, rgb.data_bytes()?.to_vec()).ok_or(
            CaptureError::Read {
                index: self.position,
                reason: "non-contiguous frame buffer".to_string(),
            },
        )?;

        let frame = Frame::new(image, self.position, self.properties.fps);
        self.position += 1;
        Ok(Some(frame))
    }
}

impl Drop for OpenCvSource {
    fn drop(&mut self) {
        if let Err(e) = self.cap.release() {
            tracing::warn!(error = %e, "Failed to release VideoCapture");
        }
    }
}

pub struct OpenCvSink {
    writer: VideoWriter,
    properties: VideoProperties,
    written: u64,
}

impl FrameSink for OpenCvSink {
    fn write(&mut self, image: &RgbImage) -> Result<(), CaptureError> {
        if image.dimensions() != (self.properties.width, self.properties.height) {
            return Err(CaptureError::FrameSize {
                width: self.properties.width,
                height: self.properties.height,
                actual_width: image.width(),
                actual_height: image.height(),
            });
        }

        let flat = Mat::from_slice(image.as_raw())?;
        let rgb = flat.reshape(3, image.height() as i32)?;
        let mut bgr = Mat::default();
        imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0, AlgorithmHint::ALGO_HINT_DEFAULT)?;

        self.writer.write(&bgr).map_err(|e| CaptureError::Write {
            index: self.written,
            reason: e.to_string(),
        })?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<u64, CaptureError> {
        self.writer.release()?;
        Ok(self.written)
    }
}
