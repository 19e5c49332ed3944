//! Session model and storage boundary.
//!
//! The question sequence, answer sequence, and analysis are each stored as
//! independently serialized JSON columns; a missing or corrupt column
//! deserializes to an empty list or empty map, never to null or a parse
//! error. Answer records are append-only and keep their question snapshot
//! forever, so later follow-up insertions never change what a past record
//! says was asked.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::EngineError;
use crate::scoring::ScoreResult;

/// Transcription collaborator boundary shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMeta {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub segments: Vec<Value>,
}

/// Immutable log entry pairing a question snapshot, an answer, and its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_index: usize,
    pub question: String,
    pub answer: String,
    pub score: ScoreResult,
    #[serde(default)]
    pub transcript_meta: Option<TranscriptMeta>,
}

/// Resume digest handed in by the resume-parsing collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeDigest {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ResumeDigest {
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty() && self.projects.is_empty() && self.keywords.is_empty()
    }
}

/// Persisted session row. The three JSON columns are independent; accessors
/// below own the (de)serialization so callers never see raw strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub questions_json: Option<String>,
    pub answers_json: Option<String>,
    pub analysis_json: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionRow {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            questions_json: None,
            answers_json: None,
            analysis_json: None,
            created_at: Utc::now(),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        decode_or_default(self.questions_json.as_deref())
    }

    pub fn set_questions(&mut self, questions: &[String]) -> Result<(), EngineError> {
        self.questions_json = Some(serde_json::to_string(questions)?);
        Ok(())
    }

    pub fn answers(&self) -> Vec<AnswerRecord> {
        decode_or_default(self.answers_json.as_deref())
    }

    pub fn set_answers(&mut self, answers: &[AnswerRecord]) -> Result<(), EngineError> {
        self.answers_json = Some(serde_json::to_string(answers)?);
        Ok(())
    }

    pub fn analysis(&self) -> Value {
        self.analysis_json
            .as_deref()
            .and_then(|s| serde_json::from_str::<Value>(s).ok())
            .filter(Value::is_object)
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    pub fn set_analysis(&mut self, analysis: &Value) -> Result<(), EngineError> {
        self.analysis_json = Some(serde_json::to_string(analysis)?);
        Ok(())
    }
}

fn decode_or_default<T: serde::de::DeserializeOwned + Default>(json: Option<&str>) -> T {
    json.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

/// Storage collaborator boundary. Rows are saved whole, so an answer append
/// plus its follow-up insertions land all-or-nothing.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, row: SessionRow) -> Result<(), EngineError>;
    async fn fetch(&self, id: Uuid) -> Result<Option<SessionRow>, EngineError>;
    async fn save(&self, row: SessionRow) -> Result<(), EngineError>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SessionRow>, EngineError>;
}

/// In-memory store. A single async mutex keeps row updates serialized.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<Uuid, SessionRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, row: SessionRow) -> Result<(), EngineError> {
        self.rows.lock().await.insert(row.id, row);
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<SessionRow>, EngineError> {
        Ok(self.rows.lock().await.get(&id).cloned())
    }

    async fn save(&self, row: SessionRow) -> Result<(), EngineError> {
        let mut rows = self.rows.lock().await;
        if !rows.contains_key(&row.id) {
            return Err(EngineError::NotFound(format!("session {}", row.id)));
        }
        rows.insert(row.id, row);
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SessionRow>, EngineError> {
        let rows = self.rows.lock().await;
        let mut out: Vec<SessionRow> = rows
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.created_at);
        Ok(out)
    }
}
