//! Frame ingestion and grayscale normalization.
//!
//! In-memory frames are 8-bit RGB (`image::RgbImage`, row-major). The
//! luma conversion uses Rec.601 weights, matching the conversion the
//! detector and classifier were tuned against.

use image::{GrayImage, Luma, RgbImage};
use std::path::Path;
use thiserror::Error;

// Rec.601 luma weights, applied to RGB channel order.
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("frame has zero width or height")]
    EmptyFrame,
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Convert an RGB frame to single-channel grayscale.
///
/// Fails fast on zero-dimension frames; nothing downstream can work
/// with them.
pub fn grayscale(frame: &RgbImage) -> Result<GrayImage, FrameError> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(FrameError::EmptyFrame);
    }

    let mut gray = GrayImage::new(width, height);
    for (x, y, pixel) in frame.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luma = LUMA_R * r as f32 + LUMA_G * g as f32 + LUMA_B * b as f32;
        gray.put_pixel(x, y, Luma([luma.round().clamp(0.0, 255.0) as u8]));
    }
    Ok(gray)
}

/// Decode a still image from disk into an RGB frame.
pub fn load_frame(path: &Path) -> Result<RgbImage, FrameError> {
    let frame = image::open(path)?.to_rgb8();
    if frame.width() == 0 || frame.height() == 0 {
        return Err(FrameError::EmptyFrame);
    }
    Ok(frame)
}
