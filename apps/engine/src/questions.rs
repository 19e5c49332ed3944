//! Question set builder — seeds a session with 15 resume-targeted questions
//! followed by 10 CS fundamentals, with no duplicate text anywhere in the
//! combined sequence.
//!
//! The resume-targeted portion tries one bounded LLM generation call first
//! and tops up from deterministic heuristics over the resume digest; the
//! fundamentals portion is sampled from a fixed four-category bank.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::llm::{prompts, LlmCall};
use crate::normalize;
use crate::session::ResumeDigest;

pub const RESUME_QUESTION_COUNT: usize = 15;
pub const FUNDAMENTALS_COUNT: usize = 10;

const OOP_QS: [&str; 10] = [
    "What is encapsulation and why is it useful?",
    "Explain inheritance with an example.",
    "What is polymorphism? Give a simple example.",
    "What is an interface vs an abstract class (short)?",
    "What are SOLID principles (brief)?",
    "What is composition and why prefer it sometimes?",
    "How does method overriding differ from overloading?",
    "What is a design pattern? Name one and explain briefly.",
    "How would you unit test an OOP class?",
    "What is an immutable object?",
];

const DBMS_QS: [&str; 7] = [
    "What is normalization and why do we normalize?",
    "What is an index and how does it help queries?",
    "What is a transaction and ACID briefly?",
    "When can denormalization help performance?",
    "What is a foreign key?",
    "What is the purpose of an execution plan?",
    "What is replication in databases?",
];

const OS_QS: [&str; 6] = [
    "What is the difference between a process and a thread?",
    "What is a race condition?",
    "What is virtual memory in brief?",
    "What is a mutex vs semaphore?",
    "What is context switching?",
    "What is paging?",
];

const CN_QS: [&str; 6] = [
    "Explain the TCP three-way handshake in short.",
    "What is UDP and when to use it?",
    "What is DNS?",
    "What is HTTP request/response lifecycle?",
    "What is TLS in brief?",
    "What is a socket?",
];

/// The full fundamentals bank: OOP, DBMS, OS, and networking questions.
pub fn fundamentals_bank() -> Vec<&'static str> {
    OOP_QS
        .iter()
        .chain(DBMS_QS.iter())
        .chain(OS_QS.iter())
        .chain(CN_QS.iter())
        .copied()
        .collect()
}

/// Reduces any structured question value to a plain string before storage.
pub fn slot_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("question")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

/// Pulls a question list out of a normalized LLM value: the `questions` key,
/// a bare list, or the first all-string list value in a map.
pub fn question_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Object(map) => {
            if let Some(items) = map.get("questions").and_then(Value::as_array) {
                return Some(items.iter().map(slot_text).collect());
            }
            for v in map.values() {
                if let Some(items) = v.as_array() {
                    if !items.is_empty() && items.iter().all(Value::is_string) {
                        return Some(items.iter().map(slot_text).collect());
                    }
                }
            }
            None
        }
        Value::Array(items) => Some(items.iter().map(slot_text).collect()),
        _ => None,
    }
}

/// Deterministic question derivation from the resume digest: project lines
/// first (two questions each), then skill tokens, then high-frequency resume
/// keywords. Order-preserving; duplicates are removed by the caller.
pub fn heuristic_questions(digest: &ResumeDigest, max: usize) -> Vec<String> {
    let mut questions = Vec::new();
    for proj in digest.projects.iter().take(4) {
        let short: String = proj.chars().take(200).collect();
        questions.push(format!(
            "Tell me about this project: {short}. What was your role and the key technical challenges?"
        ));
        questions.push(
            "For that project, how did you design the core module and how did you test it?"
                .to_string(),
        );
    }
    for skill in digest.skills.iter().take(6) {
        questions.push(format!(
            "You listed '{skill}'. Explain an important technical concept related to {skill}."
        ));
    }
    for kw in digest.keywords.iter().take(4) {
        questions.push(format!("Quick question: explain {kw} in brief."));
    }
    questions.truncate(max);
    questions
}

/// Removes exact-text duplicates, keeping first occurrences in order.
pub fn dedupe(questions: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    questions
        .into_iter()
        .filter(|q| seen.insert(q.clone()))
        .collect()
}

/// Samples the fundamentals portion: 10 uniform without replacement from the
/// bank after excluding any text already used, or all remaining if fewer
/// than 10 distinct candidates survive the exclusion.
pub fn select_fundamentals(exclude: &[String], rng: &mut impl Rng) -> Vec<String> {
    let candidates: Vec<&str> = fundamentals_bank()
        .into_iter()
        .filter(|q| !exclude.iter().any(|e| e == q))
        .collect();
    if candidates.len() >= FUNDAMENTALS_COUNT {
        candidates
            .choose_multiple(rng, FUNDAMENTALS_COUNT)
            .map(|q| q.to_string())
            .collect()
    } else {
        candidates.into_iter().map(str::to_string).collect()
    }
}

/// Builds the session's initial question sequence: one bounded LLM attempt,
/// deterministic top-up to 15 resume-targeted questions, then 10 sampled
/// fundamentals. The result never contains duplicate text.
pub async fn build_initial(
    llm: &dyn LlmCall,
    config: &EngineConfig,
    digest: &ResumeDigest,
    resume_summary: &Value,
) -> Vec<String> {
    let prompt = prompts::generate_questions(&resume_summary.to_string(), 24);
    let outcome = llm.invoke(&prompt, None, config.timeout_short).await;

    let mut questions: Vec<String> = normalize::normalize(&outcome)
        .and_then(|v| question_list(&v))
        .unwrap_or_default();

    if questions.is_empty() {
        debug!("LLM returned no usable questions; using heuristic generator");
    } else {
        info!(count = questions.len(), "LLM provided resume questions");
    }

    if questions.len() < RESUME_QUESTION_COUNT {
        let extras = heuristic_questions(digest, 30);
        questions.extend(extras);
    }
    let mut questions = dedupe(questions);
    questions.truncate(RESUME_QUESTION_COUNT);

    let fundamentals = select_fundamentals(&questions, &mut StdRng::from_entropy());
    questions.extend(fundamentals);
    questions
}
