use image::imageops::{self, FilterType};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Axis-aligned bounding region for a detected face, in pixel
/// coordinates of the source frame. Ephemeral, per-frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Region {
    pub fn from_rect(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            top: y,
            right: x + width,
            bottom: y + height,
            left: x,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

#[derive(Error, Debug)]
pub enum SampleError {
    #[error("pixel buffer length {len} does not match {width}x{height}")]
    LengthMismatch { width: u32, height: u32, len: usize },
}

/// A normalized single-channel face sample of fixed dimensions.
///
/// All stored samples share the same dimensions because the classifier
/// requires uniform input shape; [`FaceSample::extract`] is the only
/// path that produces samples from a frame, which enforces that at
/// capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceSample {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl FaceSample {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, SampleError> {
        if pixels.len() != (width as usize) * (height as usize) {
            return Err(SampleError::LengthMismatch {
                width,
                height,
                len: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Crop `region` out of a grayscale frame and resize it to a
    /// `side` × `side` sample (bilinear). The region is clamped to the
    /// frame bounds first.
    ///
    /// Deterministic: the same frame and region always produce a
    /// byte-identical sample, so enrollment and recognition crops of
    /// the same image compare at distance zero.
    pub fn extract(gray: &GrayImage, region: &Region, side: u32) -> Self {
        let (frame_w, frame_h) = gray.dimensions();
        let left = region.left.min(frame_w.saturating_sub(1));
        let top = region.top.min(frame_h.saturating_sub(1));
        let right = region.right.clamp(left + 1, frame_w);
        let bottom = region.bottom.clamp(top + 1, frame_h);

        let crop = imageops::crop_imm(gray, left, top, right - left, bottom - top).to_image();
        let resized = imageops::resize(&crop, side, side, FilterType::Triangle);

        Self {
            width: side,
            height: side,
            pixels: resized.into_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}
