//! Mock-interview engine: question sequencing, answer scoring, and session
//! analysis over unreliable LLM collaborators.
//!
//! Every LLM-touching step is a fallback chain — attempt the model call,
//! normalize whatever text comes back, and drop to a deterministic
//! computation when nothing usable survives. The engine therefore always
//! produces a result; only validation and storage problems surface as
//! errors.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod followup;
pub mod llm;
pub mod normalize;
pub mod questions;
pub mod scoring;
pub mod session;

pub use aggregate::{Analysis, CategoryAverages};
pub use config::EngineConfig;
pub use engine::{AnswerFeedback, InterviewEngine, SessionSummary, SessionView, Started};
pub use error::EngineError;
pub use llm::{LlmCall, LlmOutcome, OpenRouterClient};
pub use scoring::{ScoreResult, ScoreSource};
pub use session::{AnswerRecord, MemoryStore, ResumeDigest, SessionRow, SessionStore, TranscriptMeta};
