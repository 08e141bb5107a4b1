//! LBPH (Local Binary Patterns Histograms) face classifier.
//!
//! Each training sample becomes an 8×8 spatial grid of 256-bin LBP
//! code histograms (raw counts); prediction is nearest neighbor by
//! chi-square distance over those histograms. The trained model is a
//! pure cache of the stored samples: it is rebuilt from scratch on
//! every store mutation and can always be reconstructed when the
//! persisted blob is lost.

use crate::types::FaceSample;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// --- Named constants ---
const LBP_GRID_X: usize = 8;
const LBP_GRID_Y: usize = 8;
const LBP_BINS: usize = 256;

/// Neighbor offsets, clockwise from the top-left, one bit each.
const LBP_NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("cannot train on an empty sample set")]
    EmptyTrainingSet,
    #[error("sample is {got_w}x{got_h}, model expects {want_w}x{want_h}")]
    DimensionMismatch {
        got_w: u32,
        got_h: u32,
        want_w: u32,
        want_h: u32,
    },
    #[error("model has no trained entries")]
    EmptyModel,
}

/// Prediction for a probe sample: the nearest training label and its
/// chi-square distance. Distance is a dissimilarity score, not a
/// probability: lower is a better match, zero for an identical sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: u32,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrainedEntry {
    label: u32,
    histogram: Vec<f32>,
}

/// A trained LBPH model. Serialized as the persisted model blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbphModel {
    sample_width: u32,
    sample_height: u32,
    entries: Vec<TrainedEntry>,
}

impl LbphModel {
    /// Train from all stored samples; one histogram entry per sample.
    /// Labels may repeat (an identity with several samples).
    pub fn train(samples: &[(u32, &FaceSample)]) -> Result<Self, ClassifierError> {
        let Some(&(_, first)) = samples.first() else {
            return Err(ClassifierError::EmptyTrainingSet);
        };
        let (want_w, want_h) = (first.width(), first.height());

        let mut entries = Vec::with_capacity(samples.len());
        for &(label, sample) in samples {
            if sample.width() != want_w || sample.height() != want_h {
                return Err(ClassifierError::DimensionMismatch {
                    got_w: sample.width(),
                    got_h: sample.height(),
                    want_w,
                    want_h,
                });
            }
            entries.push(TrainedEntry {
                label,
                histogram: spatial_histogram(sample),
            });
        }

        tracing::debug!(entries = entries.len(), "trained LBPH model");
        Ok(Self {
            sample_width: want_w,
            sample_height: want_h,
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Predict the nearest training label for a probe sample.
    pub fn predict(&self, sample: &FaceSample) -> Result<Prediction, ClassifierError> {
        if sample.width() != self.sample_width || sample.height() != self.sample_height {
            return Err(ClassifierError::DimensionMismatch {
                got_w: sample.width(),
                got_h: sample.height(),
                want_w: self.sample_width,
                want_h: self.sample_height,
            });
        }

        let probe = spatial_histogram(sample);
        let mut best: Option<Prediction> = None;
        for entry in &self.entries {
            let distance = chi_square(&probe, &entry.histogram);
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(Prediction {
                    label: entry.label,
                    distance,
                });
            }
        }
        best.ok_or(ClassifierError::EmptyModel)
    }
}

/// Map a classifier distance to the UI-facing confidence in [0, 1].
///
/// `max(0, (100 - distance) / 100)`, a monotonically decreasing
/// function of distance, preserved exactly because downstream displays
/// format it as a percentage. Ordinal only, not a calibrated
/// probability.
pub fn confidence_from_distance(distance: f64) -> f32 {
    (((100.0 - distance) / 100.0).clamp(0.0, 1.0)) as f32
}

/// 8-neighbor LBP code image. Border pixels keep code 0.
fn lbp_codes(sample: &FaceSample) -> Vec<u8> {
    let w = sample.width() as usize;
    let h = sample.height() as usize;
    let px = sample.pixels();
    let mut codes = vec![0u8; w * h];
    if w < 3 || h < 3 {
        return codes;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let center = px[y * w + x];
            let mut code = 0u8;
            for (bit, &(dx, dy)) in LBP_NEIGHBORS.iter().enumerate() {
                let nx = (x as i32 + dx) as usize;
                let ny = (y as i32 + dy) as usize;
                if px[ny * w + nx] >= center {
                    code |= 1 << bit;
                }
            }
            codes[y * w + x] = code;
        }
    }
    codes
}

/// Concatenated per-cell LBP histograms (raw counts) over an 8×8 grid.
fn spatial_histogram(sample: &FaceSample) -> Vec<f32> {
    let w = sample.width() as usize;
    let h = sample.height() as usize;
    let codes = lbp_codes(sample);
    let mut histogram = vec![0f32; LBP_GRID_X * LBP_GRID_Y * LBP_BINS];

    for y in 0..h {
        let cy = (y * LBP_GRID_Y / h).min(LBP_GRID_Y - 1);
        for x in 0..w {
            let cx = (x * LBP_GRID_X / w).min(LBP_GRID_X - 1);
            let bin = codes[y * w + x] as usize;
            histogram[(cy * LBP_GRID_X + cx) * LBP_BINS + bin] += 1.0;
        }
    }
    histogram
}

fn chi_square(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b.iter()).fold(0f64, |acc, (&x, &y)| {
        let denom = (x + y) as f64;
        if denom > 0.0 {
            acc + ((x - y) as f64).powi(2) / denom
        } else {
            acc
        }
    })
}
