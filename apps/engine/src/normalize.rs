//! Response normalizer — extracts a usable structured value from an LLM call
//! result.
//!
//! Providers wrap correct JSON in commentary, markdown fences, or nested
//! envelopes, so extraction is an ordered list of independent strategies,
//! most-specific first. Each strategy is testable in isolation; the first
//! success wins. "No usable value" is a legitimate outcome, not an error.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::llm::LlmOutcome;

/// Keys that mark a parsed value as already being the payload we want.
pub const TERMINAL_KEYS: [&str; 6] = [
    "questions",
    "follow_up",
    "core_skills",
    "projects",
    "expected_answer",
    "comparison",
];

/// One extraction strategy. Applied in [`Extraction::ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Parsed map already contains a terminal key; return it as-is.
    TerminalKeys,
    /// Parsed map wraps a `message`/`result`/`output` envelope (or a bare
    /// `response` string) whose content is itself JSON text.
    NestedMessage,
    /// Provider-style envelope with a `choices` list; first candidate whose
    /// textual content parses as JSON wins.
    CandidateScan,
    /// Parsed value is directly a map or list.
    DirectValue,
    /// Lenient parse of the raw text.
    RawText,
}

impl Extraction {
    pub const ORDER: [Extraction; 5] = [
        Extraction::TerminalKeys,
        Extraction::NestedMessage,
        Extraction::CandidateScan,
        Extraction::DirectValue,
        Extraction::RawText,
    ];

    pub fn apply(&self, outcome: &LlmOutcome) -> Option<Value> {
        match self {
            Extraction::TerminalKeys => {
                let map = outcome.parsed.as_ref()?.as_object()?;
                if TERMINAL_KEYS.iter().any(|k| map.contains_key(*k)) {
                    Some(Value::Object(map.clone()))
                } else {
                    None
                }
            }
            Extraction::NestedMessage => {
                let map = outcome.parsed.as_ref()?.as_object()?;
                for envelope in ["message", "result", "output"] {
                    if let Some(inner) = map.get(envelope).and_then(Value::as_object) {
                        for field in ["content", "text", "response"] {
                            if let Some(text) = inner.get(field).and_then(Value::as_str) {
                                if let Some(value) = parse_lenient(text) {
                                    return Some(value);
                                }
                            }
                        }
                    }
                }
                let response = map.get("response").and_then(Value::as_str)?;
                parse_lenient(response)
            }
            Extraction::CandidateScan => {
                let choices = outcome
                    .parsed
                    .as_ref()?
                    .as_object()?
                    .get("choices")?
                    .as_array()?;
                for candidate in choices {
                    let text = candidate
                        .pointer("/message/content")
                        .or_else(|| candidate.pointer("/message/text"))
                        .or_else(|| candidate.get("text"))
                        .and_then(Value::as_str);
                    if let Some(value) = text.and_then(parse_lenient) {
                        return Some(value);
                    }
                }
                None
            }
            Extraction::DirectValue => match outcome.parsed.as_ref()? {
                v @ (Value::Object(_) | Value::Array(_)) => Some(v.clone()),
                _ => None,
            },
            Extraction::RawText => parse_lenient(&outcome.raw),
        }
    }
}

/// Runs the strategies in order and returns the first structured value, or
/// `None` when the response carries nothing usable.
pub fn normalize(outcome: &LlmOutcome) -> Option<Value> {
    Extraction::ORDER.iter().find_map(|s| s.apply(outcome))
}

/// Lenient JSON parse of free text: exact parse, then with markdown code
/// fences removed, then the first balanced-looking `{...}` or `[...]` span.
/// Only maps and lists count as usable values.
pub fn parse_lenient(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(value) = parse_structured(trimmed) {
        return Some(value);
    }

    let defenced = trimmed.replace("```json", "").replace("```", "");
    if let Some(value) = parse_structured(defenced.trim()) {
        return Some(value);
    }

    let span = span_regex().find(trimmed)?;
    parse_structured(span.as_str())
}

fn parse_structured(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(v @ (Value::Object(_) | Value::Array(_))) => Some(v),
        _ => None,
    }
}

fn span_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}|\[.*\]").expect("span regex"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome(raw: &str, parsed: Option<Value>) -> LlmOutcome {
        LlmOutcome {
            ok: true,
            raw: raw.to_string(),
            parsed,
            error: None,
        }
    }

    #[test]
    fn test_terminal_key_map_passes_through_unchanged() {
        let parsed = json!({"questions": ["a", "b"], "noise": 1});
        let got = normalize(&outcome("", Some(parsed.clone()))).unwrap();
        assert_eq!(got, parsed);
    }

    #[test]
    fn test_nested_message_content_is_unwrapped() {
        let parsed = json!({"message": {"content": "{\"follow_up\": \"why?\"}"}});
        let got = normalize(&outcome("", Some(parsed))).unwrap();
        assert_eq!(got, json!({"follow_up": "why?"}));
    }

    #[test]
    fn test_result_envelope_with_text_field() {
        let parsed = json!({"result": {"text": "{\"core_skills\": [\"rust\"]}"}});
        let got = normalize(&outcome("", Some(parsed))).unwrap();
        assert_eq!(got, json!({"core_skills": ["rust"]}));
    }

    #[test]
    fn test_bare_response_string_field() {
        let parsed = json!({"response": "{\"questions\": [\"q\"]}"});
        let got = Extraction::NestedMessage.apply(&outcome("", Some(parsed)));
        assert_eq!(got, Some(json!({"questions": ["q"]})));
    }

    #[test]
    fn test_candidate_scan_skips_unparseable_candidates() {
        let parsed = json!({"choices": [
            {"message": {"content": "sorry, no JSON here"}},
            {"message": {"content": "{\"questions\": [\"q1\"]}"}}
        ]});
        let got = normalize(&outcome("", Some(parsed))).unwrap();
        assert_eq!(got, json!({"questions": ["q1"]}));
    }

    #[test]
    fn test_candidate_scan_accepts_bare_text_candidate() {
        let parsed = json!({"choices": [{"text": "[1, 2, 3]"}]});
        let got = normalize(&outcome("", Some(parsed))).unwrap();
        assert_eq!(got, json!([1, 2, 3]));
    }

    #[test]
    fn test_direct_list_returned_unchanged() {
        let parsed = json!(["q1", "q2"]);
        let got = normalize(&outcome("", Some(parsed.clone()))).unwrap();
        assert_eq!(got, parsed);
    }

    #[test]
    fn test_fenced_raw_text_parses() {
        let got = normalize(&outcome("```json\n{\"questions\":[\"a\",\"b\"]}\n```", None)).unwrap();
        assert_eq!(got, json!({"questions": ["a", "b"]}));
    }

    #[test]
    fn test_raw_text_with_commentary_around_braces() {
        let raw = "Sure! Here is the JSON you asked for: {\"follow_up\": \"explain more\"} hope it helps";
        let got = normalize(&outcome(raw, None)).unwrap();
        assert_eq!(got, json!({"follow_up": "explain more"}));
    }

    #[test]
    fn test_refusal_text_yields_no_usable_value() {
        assert!(normalize(&outcome("I cannot answer that", None)).is_none());
    }

    #[test]
    fn test_scalar_json_is_not_a_usable_value() {
        assert!(parse_lenient("42").is_none());
        assert!(parse_lenient("\"just a string\"").is_none());
    }

    #[test]
    fn test_empty_outcome_yields_none() {
        assert!(normalize(&outcome("", None)).is_none());
    }

    #[test]
    fn test_specific_strategy_wins_over_direct_value() {
        // A map with a terminal key must be returned whole, not re-wrapped
        // by the generic DirectValue fallback.
        let parsed = json!({"questions": ["a"]});
        assert_eq!(
            Extraction::TerminalKeys.apply(&outcome("", Some(parsed.clone()))),
            Some(parsed)
        );
    }
}
