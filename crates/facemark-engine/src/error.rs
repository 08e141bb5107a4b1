use thiserror::Error;

/// Engine-level failures.
///
/// Enrollment validation rejections (no face, multiple faces,
/// duplicate identity) are NOT errors; they come back as a
/// [`RegisterOutcome`](crate::engine::RegisterOutcome) so the calling
/// UI can render a message without crashing the capture loop. `Err` is
/// reserved for malformed input frames and persistence failures, which
/// callers may treat as retryable; on a persistence failure the
/// operation is not committed and in-memory state still matches what
/// is durable.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] facemark_core::FrameError),
    #[error("classifier: {0}")]
    Classifier(#[from] facemark_core::ClassifierError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sample encoding: {0}")]
    Codec(#[from] bincode::Error),
    #[error("registry encoding: {0}")]
    Json(#[from] serde_json::Error),
    #[error("engine state lock poisoned")]
    Poisoned,
}
