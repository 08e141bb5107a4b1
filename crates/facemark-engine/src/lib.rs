//! facemark-engine: enrollment, recognition and attendance services.
//!
//! Orchestrates the facemark-core primitives over a durable signature
//! store: register a face under an identity, label every face in a
//! frame with an identity and confidence, and apply the once-per-day
//! attendance policy to the results.

pub mod attendance;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod store;

pub use attendance::{record_recognitions, AttendanceLedger, AttendanceRecord, LedgerError};
pub use config::EngineConfig;
pub use engine::{FaceEngine, ImageSource, Recognition, RegisterOutcome, Rejection, UNKNOWN_NAME};
pub use error::EngineError;
