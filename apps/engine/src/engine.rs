//! Interview engine — orchestrates the session lifecycle: seed questions,
//! score answers, inject follow-ups, and produce the final analysis.
//!
//! Every external step is an LLM-first / deterministic-second fallback
//! chain; the engine itself never fails because of the LLM. Mutating
//! operations on one session are serialized through a per-session lock so
//! an answer is always recorded against the question sequence it was asked
//! from.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregate::{self, Analysis};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::followup;
use crate::llm::{prompts, LlmCall};
use crate::normalize;
use crate::questions;
use crate::scoring::{self, ScoreResult, ScoreSource};
use crate::session::{AnswerRecord, ResumeDigest, SessionRow, SessionStore, TranscriptMeta};

const DEFAULT_EXPECTED_ANSWER: &str =
    "A concise, clear explanation covering main steps, reasoning, and tradeoffs.";
const DEFAULT_COMPARISON: &str = "Comparison unavailable: the answer will be compared to \
     expected points; missing technical details or examples will reduce the technical score.";

/// How many digest keywords are kept in the session for resume matching.
const RESUME_KEYWORD_LIMIT: usize = 80;

#[derive(Debug, Serialize)]
pub struct Started {
    pub session_id: Uuid,
    pub first_question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnswerFeedback {
    pub overall_score: i64,
    pub technical: i64,
    pub communication: i64,
    pub details: ScoreResult,
    pub expected_answer: String,
    pub comparison: String,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub questions: Vec<String>,
    pub answers: Vec<AnswerRecord>,
    pub analysis: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub questions_count: usize,
    pub answers_count: usize,
    pub analysis: Value,
}

pub struct InterviewEngine {
    llm: Arc<dyn LlmCall>,
    store: Arc<dyn SessionStore>,
    config: EngineConfig,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl InterviewEngine {
    pub fn new(llm: Arc<dyn LlmCall>, store: Arc<dyn SessionStore>, config: EngineConfig) -> Self {
        Self {
            llm,
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Per-session write lock. Mutations are not commutative (an answer
    /// submitted against a stale index mapping would record a mismatched
    /// pair), so every mutating operation holds this for its full duration.
    ///
    /// Entries nobody else holds (strong count 1, the map's own) are pruned
    /// on every acquisition, keeping the map bounded by the number of
    /// concurrently mutating sessions.
    async fn session_lock(&self, id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, l| Arc::strong_count(l) > 1);
        locks.entry(id).or_default().clone()
    }

    /// Starts an interview from a resume digest: summarize, seed the
    /// question sequence, persist.
    pub async fn start(
        &self,
        user_id: Uuid,
        digest: &ResumeDigest,
    ) -> Result<Started, EngineError> {
        if digest.is_empty() {
            return Err(EngineError::Validation("Upload resume first".to_string()));
        }

        let digest_text = serde_json::to_string(digest)?;
        let summary = self.summarize_resume(&digest_text, digest).await;

        let questions =
            questions::build_initial(self.llm.as_ref(), &self.config, digest, &summary).await;

        let mut row = SessionRow::new(user_id);
        row.set_questions(&questions)?;
        row.set_answers(&[])?;
        let resume_keywords: Vec<&String> = digest
            .keywords
            .iter()
            .take(RESUME_KEYWORD_LIMIT)
            .collect();
        row.set_analysis(&json!({
            "resume_summary": summary,
            "resume_keywords": resume_keywords,
        }))?;

        let session_id = row.id;
        let first_question = questions.first().cloned();
        self.store.insert(row).await?;

        info!(%session_id, questions = questions.len(), "interview started");
        Ok(Started {
            session_id,
            first_question,
        })
    }

    async fn summarize_resume(&self, digest_text: &str, digest: &ResumeDigest) -> Value {
        let prompt = prompts::summarize_resume(digest_text, self.config.summary_truncate);
        let outcome = self
            .llm
            .invoke(&prompt, None, self.config.timeout_short)
            .await;
        match normalize::normalize(&outcome) {
            Some(Value::Object(map))
                if map.contains_key("core_skills") || map.contains_key("projects") =>
            {
                Value::Object(map)
            }
            _ => {
                debug!("resume summary unusable; falling back to digest skills");
                json!({ "core_skills": digest.skills, "projects": [] })
            }
        }
    }

    /// Scores one answer and grows the question sequence with follow-ups.
    /// The record append and the follow-up insertions land in a single row
    /// save, so the operation is all-or-nothing.
    pub async fn submit_answer(
        &self,
        session_id: Uuid,
        question_index: usize,
        answer: &str,
        transcript_meta: Option<TranscriptMeta>,
    ) -> Result<AnswerFeedback, EngineError> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut row = self
            .store
            .fetch(session_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("session {session_id}")))?;

        let mut questions = row.questions();
        if question_index >= questions.len() {
            return Err(EngineError::Validation(
                "Invalid question index".to_string(),
            ));
        }
        let question = questions[question_index].clone();

        // Prefer transcript-derived text over the raw submitted text.
        let answer_text = transcript_meta
            .as_ref()
            .and_then(|m| m.text.as_deref())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(answer)
            .to_string();

        let analysis = row.analysis();
        let resume_keywords: Vec<String> = analysis
            .get("resume_keywords")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let resume_summary = analysis
            .get("resume_summary")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let (score, source) = self
            .evaluate(
                &question,
                &answer_text,
                &resume_summary,
                transcript_meta.as_ref(),
                &resume_keywords,
            )
            .await;
        info!(
            %session_id,
            question_index,
            overall = score.overall_score,
            source = ?source,
            "answer scored"
        );

        let mut answers = row.answers();
        answers.push(AnswerRecord {
            question_index,
            question: question.clone(),
            answer: answer_text.clone(),
            score: score.clone(),
            transcript_meta,
        });

        let (expected_answer, comparison) = self.expected_answer(&question, &answer_text).await;

        let follow_ups =
            followup::plan_follow_ups(self.llm.as_ref(), &self.config, &question, &answer_text)
                .await;
        followup::splice(&mut questions, question_index, &follow_ups);

        row.set_questions(&questions)?;
        row.set_answers(&answers)?;
        self.store.save(row).await?;

        Ok(AnswerFeedback {
            overall_score: score.overall_score,
            technical: score.technical,
            communication: score.communication,
            details: score,
            expected_answer,
            comparison,
        })
    }

    /// Two-stage scoring pipeline: LLM attempt (only when configured),
    /// deterministic heuristic otherwise. Whatever the source, the result is
    /// bounded before it is stored.
    async fn evaluate(
        &self,
        question: &str,
        answer: &str,
        resume_summary: &Value,
        transcript_meta: Option<&TranscriptMeta>,
        resume_keywords: &[String],
    ) -> (ScoreResult, ScoreSource) {
        if self.config.force_llm_eval {
            let prompt = prompts::evaluate_answer(question, answer, &resume_summary.to_string());
            let outcome = self
                .llm
                .invoke(&prompt, None, self.config.timeout_long)
                .await;
            if let Some(value) = normalize::normalize(&outcome).filter(Value::is_object) {
                return (scoring::sanitize(&value), ScoreSource::Llm);
            }
            debug!("LLM evaluation unusable; using heuristic scoring fallback");
        }

        let expected = scoring::expected_keywords(question);
        let score = scoring::score_answer_text(answer, &expected, transcript_meta, resume_keywords);
        (score, ScoreSource::Heuristic)
    }

    /// Best-effort expected answer and comparison; fixed fallbacks when the
    /// LLM yields nothing usable.
    async fn expected_answer(&self, question: &str, answer: &str) -> (String, String) {
        let prompt = prompts::expected_answer(question, answer);
        let outcome = self.llm.invoke(&prompt, None, self.config.timeout).await;
        let value = normalize::normalize(&outcome).unwrap_or_else(|| json!({}));

        let expected = value
            .get("expected_answer")
            .or_else(|| value.get("expected"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_EXPECTED_ANSWER)
            .to_string();
        let comparison = value
            .get("comparison")
            .or_else(|| value.get("compare"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_COMPARISON)
            .to_string();
        (expected, comparison)
    }

    /// Computes (or recomputes; last write wins) the final analysis.
    pub async fn finish(&self, session_id: Uuid) -> Result<Analysis, EngineError> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut row = self
            .store
            .fetch(session_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("session {session_id}")))?;

        let answers = row.answers();
        let analysis = aggregate::analyze(&answers)?;
        row.set_analysis(&serde_json::to_value(&analysis)?)?;
        self.store.save(row).await?;

        info!(%session_id, overall = analysis.overall_score, "interview finished");
        Ok(analysis)
    }

    pub async fn get(&self, session_id: Uuid) -> Result<SessionView, EngineError> {
        let row = self
            .store
            .fetch(session_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("session {session_id}")))?;
        Ok(SessionView {
            questions: row.questions(),
            answers: row.answers(),
            analysis: row.analysis(),
            created_at: row.created_at,
        })
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<SessionSummary>, EngineError> {
        let rows = self.store.list_for_user(user_id).await?;
        Ok(rows
            .into_iter()
            .map(|row| SessionSummary {
                id: row.id,
                created_at: row.created_at,
                questions_count: row.questions().len(),
                answers_count: row.answers().len(),
                analysis: row.analysis(),
            })
            .collect())
    }
}
