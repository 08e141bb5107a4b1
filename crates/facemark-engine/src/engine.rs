//! Enrollment and recognition services over a shared signature store.
//!
//! One `FaceEngine` owns the registry, the per-identity samples and the
//! current trained classifier behind a single `RwLock`. Mutations
//! (enroll, delete) run "mutate store → retrain → swap model" under the
//! write lock as one critical section; recognition takes the read lock
//! and therefore only ever observes a fully-retrained model. No
//! internal threading; detection and recognition are synchronous,
//! CPU-bound calls, and the mutating paths also block on disk I/O.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use facemark_core::{
    confidence_from_distance, frame, FaceDetector, FaceSample, LbphModel, Region,
};
use image::RgbImage;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::registry::IdentityRegistry;
use crate::store::StorePaths;

/// Name reported for a face that matched no enrolled identity.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Image input for enrollment: exactly one of a file on disk or an
/// in-memory RGB frame.
pub enum ImageSource<'a> {
    Path(&'a Path),
    Frame(&'a RgbImage),
}

/// One labeled face region from a recognition pass. Ephemeral: the
/// engine never persists these; attendance persistence belongs to the
/// caller (see [`crate::attendance`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    /// Matched identity, or `None` for an unknown face.
    pub identity: Option<String>,
    /// Ordinal confidence in [0, 1], derived from the classifier
    /// distance. Not a calibrated probability.
    pub confidence: f32,
    pub region: Region,
}

impl Recognition {
    pub fn name(&self) -> &str {
        self.identity.as_deref().unwrap_or(UNKNOWN_NAME)
    }
}

/// Why an enrollment request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoFaceDetected,
    MultipleFacesDetected,
    AlreadyRegistered,
}

/// Structured outcome of [`FaceEngine::register_face`].
///
/// Validation rejections land here instead of `Err` so a calling UI or
/// HTTP layer can show the message and keep its capture loop running.
#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub accepted: bool,
    pub message: String,
    pub rejection: Option<Rejection>,
}

impl RegisterOutcome {
    fn accepted(identity: &str) -> Self {
        Self {
            accepted: true,
            message: format!("successfully registered {identity}"),
            rejection: None,
        }
    }

    fn rejected(rejection: Rejection, message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message: message.into(),
            rejection: Some(rejection),
        }
    }
}

struct EngineState {
    registry: IdentityRegistry,
    /// Samples keyed by stable label.
    samples: HashMap<u32, Vec<FaceSample>>,
    /// Current trained classifier; `None` until the first identity has
    /// samples, which is the defined "everything is Unknown" state.
    model: Option<LbphModel>,
}

impl EngineState {
    /// Flatten all samples in registry order, which keeps retraining
    /// reproducible for a given store.
    fn training_set(&self) -> Vec<(u32, &FaceSample)> {
        let mut set = Vec::new();
        for entry in self.registry.entries() {
            if let Some(samples) = self.samples.get(&entry.label) {
                set.extend(samples.iter().map(|s| (entry.label, s)));
            }
        }
        set
    }

    /// Rebuild the classifier from ALL stored samples. Full retrain on
    /// every mutation is a correctness-over-efficiency choice; the
    /// training set is small at this system's scale.
    fn retrain(&mut self) -> Result<(), EngineError> {
        let set = self.training_set();
        self.model = if set.is_empty() {
            None
        } else {
            Some(LbphModel::train(&set)?)
        };
        Ok(())
    }
}

pub struct FaceEngine {
    detector: FaceDetector,
    config: EngineConfig,
    paths: StorePaths,
    state: RwLock<EngineState>,
}

impl FaceEngine {
    /// Open (or create) the signature store under the configured data
    /// directory and bring the classifier up to date.
    ///
    /// If samples exist but the persisted model blob is missing or
    /// unreadable (say a crash landed between "samples saved" and
    /// "model retrained") the classifier is retrained from the samples
    /// here, never served stale.
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        let paths = StorePaths::new(&config.data_dir);
        paths.ensure_layout()?;

        let registry = paths.load_registry()?;
        let samples = paths.load_samples(&registry)?;
        let mut state = EngineState {
            registry,
            samples,
            model: paths.load_model(),
        };

        let have_samples = state.samples.values().any(|s| !s.is_empty());
        if state.model.is_none() && have_samples {
            tracing::warn!("model blob missing or unreadable; retraining from stored samples");
            state.retrain()?;
            if let Some(model) = &state.model {
                if let Err(e) = paths.save_model(model) {
                    tracing::warn!(error = %e, "could not persist retrained model");
                }
            }
        }

        tracing::info!(
            identities = state.registry.len(),
            trained = state.model.is_some(),
            data_dir = %config.data_dir.display(),
            "signature store opened"
        );

        Ok(Self {
            detector: FaceDetector::new(config.detector_params()),
            config,
            paths,
            state: RwLock::new(state),
        })
    }

    /// Register `identity` from an image containing exactly one face.
    ///
    /// Zero faces, more than one face, or an already-registered
    /// identity are rejected with no mutation at all. On success the
    /// sample and registry are persisted first, then the classifier is
    /// retrained synchronously from all stored samples before this
    /// returns. This is the slow path.
    pub fn register_face(
        &self,
        identity: &str,
        source: ImageSource<'_>,
    ) -> Result<RegisterOutcome, EngineError> {
        let gray = match source {
            ImageSource::Path(path) => frame::grayscale(&frame::load_frame(path)?)?,
            ImageSource::Frame(rgb) => frame::grayscale(rgb)?,
        };

        let faces = self.detector.detect(&gray);
        match faces.len() {
            1 => {}
            0 => {
                return Ok(RegisterOutcome::rejected(
                    Rejection::NoFaceDetected,
                    "no face detected in the image",
                ))
            }
            n => {
                return Ok(RegisterOutcome::rejected(
                    Rejection::MultipleFacesDetected,
                    format!("multiple faces detected ({n}); ensure only one face is visible"),
                ))
            }
        }
        let sample = FaceSample::extract(&gray, &faces[0], self.config.sample_size);

        let mut state = self.write_state()?;

        // Persist the candidate registry and samples before touching
        // in-memory state: a failed write leaves memory matching what
        // is durable, and the operation is simply not committed.
        let mut registry = state.registry.clone();
        let Some(label) = registry.register(identity) else {
            return Ok(RegisterOutcome::rejected(
                Rejection::AlreadyRegistered,
                format!("'{identity}' is already registered"),
            ));
        };
        let mut samples = state.samples.get(&label).cloned().unwrap_or_default();
        samples.push(sample);

        self.paths.save_samples(label, &samples)?;
        self.paths.save_registry(&registry)?;

        state.registry = registry;
        state.samples.insert(label, samples);
        state.retrain()?;
        if let Some(model) = &state.model {
            if let Err(e) = self.paths.save_model(model) {
                // The blob is a rebuildable cache: startup retrains from
                // the already-durable samples, so the enrollment stands.
                tracing::warn!(error = %e, "model blob write failed; will retrain at next startup");
            }
        }

        tracing::info!(identity = %identity, label, "enrolled identity");
        Ok(RegisterOutcome::accepted(identity))
    }

    /// Label every face in the frame with an identity and confidence.
    ///
    /// Read-only: never mutates the store, registry or classifier.
    /// With no enrolled identities (or an untrained classifier) every
    /// detection comes back Unknown with confidence 0; recognition
    /// never errors on "no match", an attendance kiosk has to keep
    /// running.
    pub fn recognize_faces(&self, rgb: &RgbImage) -> Result<Vec<Recognition>, EngineError> {
        let gray = frame::grayscale(rgb)?;
        let regions = self.detector.detect(&gray);

        let state = self.read_state()?;
        let mut results = Vec::with_capacity(regions.len());
        for region in regions {
            let sample = FaceSample::extract(&gray, &region, self.config.sample_size);
            results.push(self.evaluate(&state, region, &sample)?);
        }
        Ok(results)
    }

    /// Apply the acceptance rule to one probe sample: accept the
    /// predicted label only if the distance beats the threshold AND the
    /// label resolves to a registered identity.
    fn evaluate(
        &self,
        state: &EngineState,
        region: Region,
        sample: &FaceSample,
    ) -> Result<Recognition, EngineError> {
        let unknown = Recognition {
            identity: None,
            confidence: 0.0,
            region,
        };

        let Some(model) = &state.model else {
            return Ok(unknown);
        };
        let prediction = model.predict(sample)?;
        if prediction.distance >= self.config.distance_threshold {
            return Ok(unknown);
        }
        let Some(identity) = state.registry.identity_of(prediction.label) else {
            // trained label retired by a deletion the model has not
            // caught up with; treated as no match
            return Ok(unknown);
        };

        let confidence = confidence_from_distance(prediction.distance);
        tracing::debug!(
            identity = %identity,
            distance = prediction.distance,
            confidence,
            "match accepted"
        );
        Ok(Recognition {
            identity: Some(identity.to_string()),
            confidence,
            region,
        })
    }

    /// Remove an identity and all its samples, retraining the
    /// classifier from whatever remains. Returns `Ok(false)`, not an
    /// error, when the identity was never registered.
    pub fn delete_identity(&self, identity: &str) -> Result<bool, EngineError> {
        let mut state = self.write_state()?;

        let mut registry = state.registry.clone();
        let Some(label) = registry.remove(identity) else {
            return Ok(false);
        };

        self.paths.save_registry(&registry)?;
        self.paths.remove_samples(label)?;

        state.registry = registry;
        state.samples.remove(&label);
        state.retrain()?;
        match &state.model {
            Some(model) => {
                if let Err(e) = self.paths.save_model(model) {
                    tracing::warn!(error = %e, "model blob write failed; will retrain at next startup");
                }
            }
            None => {
                if let Err(e) = self.paths.remove_model() {
                    tracing::warn!(error = %e, "stale model blob not removed");
                }
            }
        }

        tracing::info!(
            identity = %identity,
            label,
            remaining = state.registry.len(),
            "deleted identity"
        );
        Ok(true)
    }

    /// Registered identities in enrollment order.
    pub fn registered_identities(&self) -> Result<Vec<String>, EngineError> {
        let state = self.read_state()?;
        Ok(state.registry.identities().map(str::to_owned).collect())
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, EngineState>, EngineError> {
        self.state.read().map_err(|_| EngineError::Poisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, EngineState>, EngineError> {
        self.state.write().map_err(|_| EngineError::Poisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognition_name_falls_back_to_unknown() {
        let region = Region::from_rect(0, 0, 10, 10);
        let known = Recognition {
            identity: Some("T001".into()),
            confidence: 0.9,
            region,
        };
        let unknown = Recognition {
            identity: None,
            confidence: 0.0,
            region,
        };
        assert_eq!(known.name(), "T001");
        assert_eq!(unknown.name(), UNKNOWN_NAME);
    }

    #[test]
    fn test_register_outcome_constructors() {
        let ok = RegisterOutcome::accepted("T001");
        assert!(ok.accepted);
        assert!(ok.rejection.is_none());
        assert!(ok.message.contains("T001"));

        let rejected = RegisterOutcome::rejected(Rejection::NoFaceDetected, "no face");
        assert!(!rejected.accepted);
        assert_eq!(rejected.rejection, Some(Rejection::NoFaceDetected));
    }
}
