//! Synthetic frames for end-to-end tests.
//!
//! Frames are neutral gray (R = G = B) so the luma conversion keeps
//! the painted values exactly. The face geometry matches the
//! detector's band layout: a skin square with two dark eyes and a dark
//! mouth.

#![allow(dead_code)]

use facemark_engine::EngineConfig;
use image::{Rgb, RgbImage};
use std::path::Path;

pub const BG: u8 = 200;

/// Route engine logs through the test harness; honors `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn blank_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([BG; 3]))
}

fn fill(frame: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, value: u8) {
    for y in y0..y1.min(frame.height()) {
        for x in x0..x1.min(frame.width()) {
            frame.put_pixel(x, y, Rgb([value; 3]));
        }
    }
}

/// Schematic frontal face used for enrollment of the primary identity.
pub fn paint_face(frame: &mut RgbImage, left: u32, top: u32, side: u32) {
    let f = |frac: f32| (side as f32 * frac) as u32;
    fill(frame, left, top, left + side, top + side, 180);
    fill(frame, left + f(0.18), top + f(0.25), left + f(0.42), top + f(0.40), 40);
    fill(frame, left + f(0.58), top + f(0.25), left + f(0.82), top + f(0.40), 40);
    fill(frame, left + f(0.30), top + f(0.70), left + f(0.70), top + f(0.86), 60);
}

/// A clearly different face: darker skin with a stripe texture,
/// lower-set eyes and a wider mouth. Still detected as one face, but
/// its LBP texture is far from [`paint_face`]'s.
pub fn paint_variant_face(frame: &mut RgbImage, left: u32, top: u32, side: u32) {
    let f = |frac: f32| (side as f32 * frac) as u32;
    for y in 0..side {
        let value = if y % 6 < 2 { 138 } else { 150 };
        fill(frame, left, top + y, left + side, top + y + 1, value);
    }
    fill(frame, left + f(0.16), top + f(0.28), left + f(0.40), top + f(0.42), 30);
    fill(frame, left + f(0.60), top + f(0.28), left + f(0.84), top + f(0.42), 30);
    fill(frame, left + f(0.28), top + f(0.72), left + f(0.72), top + f(0.90), 40);
}

pub fn face_frame() -> RgbImage {
    let mut frame = blank_frame(300, 300);
    paint_face(&mut frame, 100, 100, 100);
    frame
}

pub fn variant_frame() -> RgbImage {
    let mut frame = blank_frame(300, 300);
    paint_variant_face(&mut frame, 100, 100, 100);
    frame
}

pub fn two_face_frame() -> RgbImage {
    let mut frame = blank_frame(440, 120);
    paint_face(&mut frame, 20, 10, 100);
    paint_face(&mut frame, 320, 10, 100);
    frame
}

pub fn test_config(root: &Path) -> EngineConfig {
    EngineConfig {
        data_dir: root.join("store"),
        ..EngineConfig::default()
    }
}
