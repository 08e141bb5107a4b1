//! facemark-core: face detection and recognition primitives.
//!
//! Pure algorithms with no stored state: frame normalization, a
//! multi-scale sliding-window face detector, and the trainable LBPH
//! classifier. Stateful orchestration (signature store, enrollment,
//! recognition, attendance) lives in facemark-engine.

pub mod classifier;
pub mod detector;
pub mod frame;
pub mod types;

pub use classifier::{confidence_from_distance, ClassifierError, LbphModel, Prediction};
pub use detector::{DetectorParams, FaceDetector};
pub use frame::FrameError;
pub use types::{FaceSample, Region};
