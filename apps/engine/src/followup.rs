//! Follow-up injector — decides and splices 0-2 follow-up questions into the
//! live sequence right after the answered index.
//!
//! One quick LLM attempt for a single follow-up; when nothing usable comes
//! back, exactly two deterministic follow-ups are synthesized instead.
//! Insertion never renumbers past answer records: they keep their original
//! index and question snapshot.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::llm::{prompts, LlmCall};
use crate::normalize;

pub const MAX_FOLLOW_UPS: usize = 2;

/// Nouns probed for in the question text when synthesizing the deterministic
/// design-decision follow-up. First case-insensitive match wins.
const KEY_NOUNS: &str =
    "project|module|service|database|api|algorithm|function|component|model|schema|index";

fn noun_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!("(?i)({KEY_NOUNS})")).expect("noun regex"))
}

/// The two fixed fallback follow-ups for a question.
pub fn deterministic_follow_ups(question: &str) -> Vec<String> {
    let noun = noun_regex()
        .find(question)
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| "component".to_string());
    vec![
        format!(
            "For the previous answer, explain the key design decision for the {noun} in more detail."
        ),
        "What testing strategy and edge-case handling would you implement for this part of the system?"
            .to_string(),
    ]
}

/// Accepts only a map carrying a non-empty `follow_up` string. Normalized
/// values are always maps or lists; anything else means fallback.
fn llm_follow_up(value: &Value) -> Option<String> {
    value
        .as_object()?
        .get("follow_up")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Produces the follow-ups for a just-answered (question, answer) pair:
/// one LLM-generated question, or the two deterministic ones.
pub async fn plan_follow_ups(
    llm: &dyn LlmCall,
    config: &EngineConfig,
    question: &str,
    answer: &str,
) -> Vec<String> {
    let prompt = prompts::follow_up(question, answer);
    let outcome = llm
        .invoke(&prompt, Some(&config.fast_model), config.timeout_short)
        .await;

    if let Some(fu) = normalize::normalize(&outcome).and_then(|v| llm_follow_up(&v)) {
        info!("using LLM follow-up");
        return vec![fu];
    }

    debug!("no usable LLM follow-up; synthesizing deterministic pair");
    deterministic_follow_ups(question)
}

/// Splices at most [`MAX_FOLLOW_UPS`] follow-ups into the question sequence
/// immediately after `answered_index`, appending when the insertion point
/// runs past the current end. The sequence only ever grows.
pub fn splice(questions: &mut Vec<String>, answered_index: usize, follow_ups: &[String]) {
    let insert_at = answered_index + 1;
    for (i, fu) in follow_ups.iter().take(MAX_FOLLOW_UPS).enumerate() {
        let pos = insert_at + i;
        if pos <= questions.len() {
            questions.insert(pos, fu.clone());
        } else {
            questions.push(fu.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmOutcome;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct CannedLlm(LlmOutcome);

    #[async_trait]
    impl LlmCall for CannedLlm {
        async fn invoke(&self, _: &str, _: Option<&str>, _: Duration) -> LlmOutcome {
            self.0.clone()
        }
    }

    fn qs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_noun_detection_is_case_insensitive() {
        let fus = deterministic_follow_ups("How did you tune the Database indexes?");
        assert!(fus[0].contains("the database"));
    }

    #[test]
    fn test_noun_defaults_to_component() {
        let fus = deterministic_follow_ups("Explain encapsulation briefly.");
        assert!(fus[0].contains("the component"));
        assert_eq!(fus.len(), 2);
    }

    #[test]
    fn test_first_noun_in_text_wins() {
        let fus = deterministic_follow_ups("In that project, which algorithm did you pick?");
        assert!(fus[0].contains("the project"));
    }

    #[test]
    fn test_splice_inserts_after_answered_index() {
        let mut questions = qs(&["q0", "q1", "q2"]);
        splice(&mut questions, 0, &qs(&["f1", "f2"]));
        assert_eq!(questions, qs(&["q0", "f1", "f2", "q1", "q2"]));
    }

    #[test]
    fn test_splice_appends_when_past_end() {
        let mut questions = qs(&["q0"]);
        splice(&mut questions, 5, &qs(&["f1", "f2"]));
        assert_eq!(questions, qs(&["q0", "f1", "f2"]));
    }

    #[test]
    fn test_splice_caps_at_two_insertions() {
        let mut questions = qs(&["q0", "q1"]);
        let before = questions.len();
        splice(&mut questions, 0, &qs(&["f1", "f2", "f3", "f4"]));
        assert_eq!(questions.len(), before + MAX_FOLLOW_UPS);
    }

    #[test]
    fn test_splice_with_no_follow_ups_is_a_no_op() {
        let mut questions = qs(&["q0", "q1"]);
        splice(&mut questions, 0, &[]);
        assert_eq!(questions, qs(&["q0", "q1"]));
    }

    #[tokio::test]
    async fn test_llm_follow_up_accepted_as_single_question() {
        let llm = CannedLlm(LlmOutcome {
            ok: true,
            raw: String::new(),
            parsed: Some(json!({"follow_up": "Why is that thread-safe?"})),
            error: None,
        });
        let fus = plan_follow_ups(&llm, &EngineConfig::default(), "q", "a").await;
        assert_eq!(fus, vec!["Why is that thread-safe?"]);
    }

    #[tokio::test]
    async fn test_failed_llm_yields_deterministic_pair() {
        let llm = CannedLlm(LlmOutcome::failure("timeout"));
        let fus = plan_follow_ups(&llm, &EngineConfig::default(), "Explain the api design.", "a").await;
        assert_eq!(fus.len(), 2);
        assert!(fus[0].contains("the api"));
        assert!(fus[1].contains("testing strategy"));
    }

    #[tokio::test]
    async fn test_wrong_shape_llm_value_falls_back() {
        // A map without a follow_up string is not accepted.
        let llm = CannedLlm(LlmOutcome {
            ok: true,
            raw: String::new(),
            parsed: Some(json!({"questions": ["not a follow-up"]})),
            error: None,
        });
        let fus = plan_follow_ups(&llm, &EngineConfig::default(), "q", "a").await;
        assert_eq!(fus.len(), 2);
    }

    #[tokio::test]
    async fn test_list_shaped_llm_value_falls_back() {
        let llm = CannedLlm(LlmOutcome {
            ok: true,
            raw: String::new(),
            parsed: Some(json!(["a list is not a follow-up"])),
            error: None,
        });
        let fus = plan_follow_ups(&llm, &EngineConfig::default(), "q", "a").await;
        assert_eq!(fus.len(), 2);
        assert!(fus[1].contains("testing strategy"));
    }

    #[test]
    fn test_empty_follow_up_string_rejected() {
        assert!(llm_follow_up(&json!({"follow_up": "   "})).is_none());
        assert!(llm_follow_up(&json!({"follow_up": "why?"})).is_some());
    }
}
