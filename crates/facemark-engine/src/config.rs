//! Engine configuration, loaded from environment variables.

use facemark_core::DetectorParams;
use std::path::PathBuf;

/// Engine configuration with documented defaults. Fields are plain so
/// tests and embedding callers can construct a config directly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding the identity registry, per-identity sample
    /// files and the trained model blob.
    pub data_dir: PathBuf,
    /// Detector window growth per scale pass (default: 1.1).
    pub scale_factor: f32,
    /// Minimum overlapping detector votes for a face (default: 5).
    pub min_neighbors: u32,
    /// Smallest detectable face in pixels (default: 100).
    pub min_face_size: u32,
    /// Side of the normalized square face sample in pixels
    /// (default: 200).
    pub sample_size: u32,
    /// Classifier distance below which a match is accepted
    /// (default: 45, strict). A false rejection costs the person a
    /// retry; a false acceptance corrupts attendance integrity.
    pub distance_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            scale_factor: 1.1,
            min_neighbors: 5,
            min_face_size: 100,
            sample_size: 200,
            distance_threshold: 45.0,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `FACEMARK_*` environment variables,
    /// falling back to the defaults above.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: std::env::var("FACEMARK_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            scale_factor: env_f32("FACEMARK_SCALE_FACTOR", defaults.scale_factor),
            min_neighbors: env_u32("FACEMARK_MIN_NEIGHBORS", defaults.min_neighbors),
            min_face_size: env_u32("FACEMARK_MIN_FACE_SIZE", defaults.min_face_size),
            sample_size: env_u32("FACEMARK_SAMPLE_SIZE", defaults.sample_size),
            distance_threshold: env_f64(
                "FACEMARK_DISTANCE_THRESHOLD",
                defaults.distance_threshold,
            ),
        }
    }

    pub fn detector_params(&self) -> DetectorParams {
        DetectorParams {
            scale_factor: self.scale_factor,
            min_neighbors: self.min_neighbors,
            min_size: self.min_face_size,
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.scale_factor, 1.1);
        assert_eq!(config.min_neighbors, 5);
        assert_eq!(config.min_face_size, 100);
        assert_eq!(config.sample_size, 200);
        assert_eq!(config.distance_threshold, 45.0);
    }

    #[test]
    fn test_detector_params_mirror_config() {
        let config = EngineConfig {
            scale_factor: 1.2,
            min_neighbors: 3,
            min_face_size: 80,
            ..EngineConfig::default()
        };
        let params = config.detector_params();
        assert_eq!(params.scale_factor, 1.2);
        assert_eq!(params.min_neighbors, 3);
        assert_eq!(params.min_size, 80);
    }
}
