//! Still-frame encoding.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use super::types::{Frame, SessionError};

/// MIME type of encoded stills.
pub const PHOTO_MIME: &str = "image/jpeg";

/// Default JPEG quality (0.95 on a 0..1 scale).
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Encode an RGB frame as JPEG at its native resolution.
///
/// Quality is clamped to 1..=100.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, SessionError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(SessionError::Encode("frame has zero size".to_string()));
    }
    if !frame.is_well_formed() {
        return Err(SessionError::Encode(format!(
            "expected {} bytes for {}x{} RGB, got {}",
            frame.width as usize * frame.height as usize * 3,
            frame.width,
            frame.height,
            frame.data.len()
        )));
    }

    let mut out = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
        encoder
            .encode(&frame.data, frame.width, frame.height, ExtendedColorType::Rgb8)
            .map_err(|e| SessionError::Encode(e.to_string()))?;
    }
    Ok(out)
}
