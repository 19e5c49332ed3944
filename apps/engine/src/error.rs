use thiserror::Error;

/// Engine-level error type.
///
/// Only validation and storage problems surface here. External-service
/// failures (LLM, transcription) are folded into a not-ok [`LlmOutcome`]
/// at the call boundary, and unparseable responses silently trigger the
/// deterministic fallback path; neither ever becomes an `EngineError`.
///
/// [`LlmOutcome`]: crate::llm::LlmOutcome
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}
