//! Multi-scale sliding-window face detector.
//!
//! Scans square windows over an integral image, growing the window by a
//! configurable scale factor per pass. Each window is scored by
//! Haar-like band contrasts (eye band darker than cheek band, mouth
//! band darker than cheek band, left/right eye symmetry) plus a
//! contrast floor that rejects flat regions. Overlapping hits are
//! grouped by rectangle similarity; a cluster needs a minimum number of
//! neighbor votes to count as a face.
//!
//! Pure function of the frame and parameters: no side effects, and the
//! same frame always yields the same regions, in raster-scan order.

use crate::types::Region;
use image::GrayImage;
use std::collections::HashMap;

// --- Named constants (window geometry in fractions of the window side) ---
const WINDOW_STEP_DIVISOR: u32 = 20;
const MIN_WINDOW_STDDEV: f32 = 12.0;
const EYE_CHEEK_CONTRAST: f32 = 8.0;
const MOUTH_CHEEK_CONTRAST: f32 = 8.0;
const MAX_EYE_ASYMMETRY: f32 = 28.0;
const GROUP_EPS: f32 = 0.2;

const EYE_BAND: Band = Band {
    top: 0.20,
    bottom: 0.45,
    left: 0.10,
    right: 0.90,
};
const CHEEK_BAND: Band = Band {
    top: 0.45,
    bottom: 0.68,
    left: 0.10,
    right: 0.90,
};
const MOUTH_BAND: Band = Band {
    top: 0.68,
    bottom: 0.92,
    left: 0.25,
    right: 0.75,
};
const LEFT_EYE_BAND: Band = Band {
    top: 0.20,
    bottom: 0.45,
    left: 0.10,
    right: 0.50,
};
const RIGHT_EYE_BAND: Band = Band {
    top: 0.20,
    bottom: 0.45,
    left: 0.50,
    right: 0.90,
};

/// Detector parameters with the documented defaults.
#[derive(Debug, Clone, Copy)]
pub struct DetectorParams {
    /// Multiplicative window growth per scale pass.
    pub scale_factor: f32,
    /// Minimum overlapping votes for a cluster to count as a face.
    pub min_neighbors: u32,
    /// Smallest window side in pixels; frames smaller than this in
    /// either dimension produce no detections.
    pub min_size: u32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: 100,
        }
    }
}

pub struct FaceDetector {
    params: DetectorParams,
}

impl FaceDetector {
    pub fn new(params: DetectorParams) -> Self {
        Self { params }
    }

    /// Detect faces in a grayscale frame, returning zero or more
    /// bounding regions in raster-scan order (top, then left).
    pub fn detect(&self, gray: &GrayImage) -> Vec<Region> {
        let (width, height) = gray.dimensions();
        if width < self.params.min_size || height < self.params.min_size {
            return Vec::new();
        }

        let integral = IntegralImage::new(gray);
        let max_side = width.min(height);
        let mut hits: Vec<Hit> = Vec::new();

        let mut side_f = self.params.min_size as f32;
        loop {
            let side = side_f.round() as u32;
            if side > max_side {
                break;
            }
            let step = (side / WINDOW_STEP_DIVISOR).max(1);
            let mut y = 0;
            while y + side <= height {
                let mut x = 0;
                while x + side <= width {
                    if window_is_face(&integral, x, y, side) {
                        hits.push(Hit { x, y, side });
                    }
                    x += step;
                }
                y += step;
            }
            if self.params.scale_factor <= 1.0 {
                break; // non-growing scale would loop forever
            }
            side_f *= self.params.scale_factor;
        }

        let mut faces = group_hits(&hits, self.params.min_neighbors);
        faces.sort_by_key(|h| (h.y, h.x));
        tracing::debug!(
            candidates = hits.len(),
            faces = faces.len(),
            "detection pass"
        );
        faces
            .into_iter()
            .map(|h| Region::from_rect(h.x, h.y, h.side, h.side))
            .collect()
    }
}

/// One passing square window.
#[derive(Debug, Clone, Copy)]
struct Hit {
    x: u32,
    y: u32,
    side: u32,
}

/// A rectangular band in fractions of the window side.
struct Band {
    top: f32,
    bottom: f32,
    left: f32,
    right: f32,
}

/// Summed-area table over pixel values and squared pixel values,
/// with one row/column of zero padding.
struct IntegralImage {
    width: usize,
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
}

impl IntegralImage {
    fn new(gray: &GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        let (w, h) = (w as usize, h as usize);
        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut sq_sum = vec![0u64; stride * (h + 1)];
        let raw = gray.as_raw();

        for y in 0..h {
            let mut row = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w {
                let v = raw[y * w + x] as u64;
                row += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + (x + 1);
                sum[idx] = sum[idx - stride] + row;
                sq_sum[idx] = sq_sum[idx - stride] + row_sq;
            }
        }

        Self {
            width: w,
            sum,
            sq_sum,
        }
    }

    fn rect_sum(table: &[u64], stride: usize, x: u32, y: u32, w: u32, h: u32) -> u64 {
        let (x, y, w, h) = (x as usize, y as usize, w as usize, h as usize);
        table[(y + h) * stride + (x + w)] + table[y * stride + x]
            - table[y * stride + (x + w)]
            - table[(y + h) * stride + x]
    }

    fn mean(&self, x: u32, y: u32, w: u32, h: u32) -> f32 {
        let area = (w as f32) * (h as f32);
        if area == 0.0 {
            return 0.0;
        }
        Self::rect_sum(&self.sum, self.width + 1, x, y, w, h) as f32 / area
    }

    fn stddev(&self, x: u32, y: u32, w: u32, h: u32) -> f32 {
        let area = (w as f32) * (h as f32);
        if area == 0.0 {
            return 0.0;
        }
        let mean = self.mean(x, y, w, h);
        let sq_mean = Self::rect_sum(&self.sq_sum, self.width + 1, x, y, w, h) as f32 / area;
        (sq_mean - mean * mean).max(0.0).sqrt()
    }
}

/// Mean pixel value of a band inside the window at (x, y) with the
/// given side.
fn band_mean(integral: &IntegralImage, x: u32, y: u32, side: u32, band: &Band) -> f32 {
    let s = side as f32;
    let bx = x + (s * band.left) as u32;
    let by = y + (s * band.top) as u32;
    let bw = (((s * band.right) as u32).saturating_sub((s * band.left) as u32)).max(1);
    let bh = (((s * band.bottom) as u32).saturating_sub((s * band.top) as u32)).max(1);
    integral.mean(bx, by, bw, bh)
}

fn window_is_face(integral: &IntegralImage, x: u32, y: u32, side: u32) -> bool {
    // Contrast floor first: flat windows (walls, sky) fail cheaply.
    if integral.stddev(x, y, side, side) < MIN_WINDOW_STDDEV {
        return false;
    }

    let eye = band_mean(integral, x, y, side, &EYE_BAND);
    let cheek = band_mean(integral, x, y, side, &CHEEK_BAND);
    let mouth = band_mean(integral, x, y, side, &MOUTH_BAND);

    if cheek - eye < EYE_CHEEK_CONTRAST {
        return false;
    }
    if cheek - mouth < MOUTH_CHEEK_CONTRAST {
        return false;
    }

    // Frontal faces are left/right symmetric in the eye band; windows
    // straddling a face edge are not.
    let eye_left = band_mean(integral, x, y, side, &LEFT_EYE_BAND);
    let eye_right = band_mean(integral, x, y, side, &RIGHT_EYE_BAND);
    (eye_left - eye_right).abs() <= MAX_EYE_ASYMMETRY
}

/// Group overlapping hits by rectangle similarity and keep clusters
/// with at least `min_neighbors` votes, emitting the vote-averaged
/// rectangle per cluster.
fn group_hits(hits: &[Hit], min_neighbors: u32) -> Vec<Hit> {
    let mut parent: Vec<usize> = (0..hits.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..hits.len() {
        for j in (i + 1)..hits.len() {
            if similar(&hits[i], &hits[j]) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[ri] = rj;
                }
            }
        }
    }

    // root → (count, sum_x, sum_y, sum_side)
    let mut clusters: HashMap<usize, (u64, u64, u64, u64)> = HashMap::new();
    for (i, hit) in hits.iter().enumerate() {
        let root = find(&mut parent, i);
        let entry = clusters.entry(root).or_insert((0, 0, 0, 0));
        entry.0 += 1;
        entry.1 += hit.x as u64;
        entry.2 += hit.y as u64;
        entry.3 += hit.side as u64;
    }

    clusters
        .into_values()
        .filter(|&(count, ..)| count >= min_neighbors as u64)
        .map(|(count, sx, sy, ss)| Hit {
            x: (sx / count) as u32,
            y: (sy / count) as u32,
            side: (ss / count) as u32,
        })
        .collect()
}

fn similar(a: &Hit, b: &Hit) -> bool {
    let eps = GROUP_EPS * a.side.min(b.side) as f32;
    let close = |p: u32, q: u32| (p as f32 - q as f32).abs() <= eps;
    close(a.x, b.x) && close(a.y, b.y) && close(a.side, b.side)
}
