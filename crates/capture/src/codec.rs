use crate::CaptureError;
use base64::{Engine, engine::general_purpose::STANDARD};
use image::{RgbImage, codecs::jpeg::JpegEncoder};

const SCREENSHOT_QUALITY: u8 = 85;

/// Encode an RGB frame to JPEG bytes.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let mut buf = Vec::with_capacity((image.width() * image.height()) as usize / 4);
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(image)?;
    Ok(buf)
}

/// JPEG + standard base64, the form screenshots travel in over JSON.
pub fn encode_screenshot(image: &RgbImage) -> Result<String, CaptureError> {
    let jpeg = encode_jpeg(image, SCREENSHOT_QUALITY)?;
    Ok(STANDARD.encode(jpeg))
}

/// Decode JPEG or PNG bytes into an RGB frame.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, CaptureError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Decode a base64 image, with or without a `data:image/...;base64,` prefix.
pub fn decode_base64_image(text: &str) -> Result<RgbImage, CaptureError> {
    let text = text.trim();
    let payload = match text.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => text,
    };
    let bytes = STANDARD.decode(payload)?;
    decode_image(&bytes)
}
