//! Answer scorer — the deterministic heuristic fallback and the canonical
//! bounds enforcer for any externally supplied score.
//!
//! The formulas and magic constants are load-bearing: they are preserved
//! verbatim from the production scoring behavior, because changing them
//! silently changes user-visible results. Integer conversions truncate;
//! only the overall score rounds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::TranscriptMeta;

/// Where a [`ScoreResult`] came from. The two-stage pipeline (LLM attempt,
/// else heuristic) reports provenance explicitly instead of nesting error
/// handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    Llm,
    Heuristic,
}

/// Speech-delivery metrics derived from the answer text and, when present,
/// the transcript duration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechMeta {
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub wpm: Option<i64>,
    #[serde(default)]
    pub filler_count: i64,
    #[serde(default)]
    pub word_count: i64,
    #[serde(default)]
    pub lexical_diversity: f64,
    #[serde(default)]
    pub sentence_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreMeta {
    #[serde(default)]
    pub keyword_ratio: f64,
    #[serde(default)]
    pub tech_hits: i64,
}

/// The bounded, multi-dimensional outcome of scoring one answer. Every
/// numeric field lives in [0, 100] (`resume_bonus` in [0, 10]); the list
/// fields are never null, only possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    #[serde(default)]
    pub overall_score: i64,
    #[serde(default)]
    pub technical: i64,
    #[serde(default)]
    pub communication: i64,
    #[serde(default)]
    pub depth: i64,
    #[serde(default)]
    pub resume_match: i64,
    #[serde(default)]
    pub resume_bonus: i64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub speech_meta: SpeechMeta,
    #[serde(default)]
    pub meta: ScoreMeta,
}

/// Filler phrases counted as substrings of the lower-cased answer.
const FILLER_WORDS: [&str; 10] = [
    "um", "uh", "hmm", "like", "you know", "so", "actually", "basically", "right", "okay",
];

/// Fixed technical vocabulary; each phrase present in the lower-cased answer
/// counts as one tech hit.
const TECH_TERMS: [&str; 33] = [
    "algorithm",
    "complexity",
    "big o",
    "optimization",
    "optimize",
    "scale",
    "scalability",
    "latency",
    "throughput",
    "index",
    "sql",
    "normaliz",
    "thread",
    "deadlock",
    "concurrency",
    "asynchronous",
    "hash",
    "queue",
    "stack",
    "graph",
    "tree",
    "database",
    "cache",
    "redis",
    "docker",
    "kubernetes",
    "api",
    "endpoint",
    "http",
    "tcp",
    "udp",
    "encryption",
    "oauth",
];

/// Case-folded alphanumeric tokens (underscore included, word-style).
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Expected keywords derived from a question: its first 12 word tokens.
pub fn expected_keywords(question: &str) -> Vec<String> {
    tokenize(question).into_iter().take(12).collect()
}

fn sentence_count(text: &str) -> i64 {
    text.split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count() as i64
}

/// Fraction of expected keywords found as exact token or substring match.
fn keyword_match_score(expected: &[String], tokens: &[String]) -> f64 {
    if expected.is_empty() {
        return 0.0;
    }
    let expected_norm: Vec<String> = expected
        .iter()
        .filter(|e| !e.trim().is_empty())
        .map(|e| e.to_lowercase())
        .collect();
    let mut matches = 0usize;
    for e in &expected_norm {
        let e_toks = tokenize(e);
        if tokens.iter().any(|t| e_toks.iter().any(|et| t == et)) {
            matches += 1;
        } else if tokens.iter().any(|t| t.contains(e.as_str())) {
            matches += 1;
        }
    }
    matches as f64 / expected_norm.len().max(1) as f64
}

fn similarity_ratio(a: &str, b: &str) -> f64 {
    strsim::sorensen_dice(a, b)
}

fn clamp100(v: i64) -> i64 {
    v.clamp(0, 100)
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Deterministic heuristic scorer. Pure: identical inputs always produce a
/// bit-identical [`ScoreResult`].
///
/// - `expected_keywords`: short keyword list derived from the question.
/// - `transcript_meta`: optional spoken-answer metadata (duration seconds).
/// - `resume_keywords`: tokens extracted from the resume; when empty, the
///   resume-match factor falls back to text similarity against the joined
///   expected keywords.
pub fn score_answer_text(
    answer: &str,
    expected_keywords: &[String],
    transcript_meta: Option<&TranscriptMeta>,
    resume_keywords: &[String],
) -> ScoreResult {
    let a = answer.trim();
    let text_lower = a.to_lowercase();
    let tokens = tokenize(a);
    let word_count = tokens.len() as i64;
    let sentences = sentence_count(a);
    let unique_words = {
        let mut seen = std::collections::HashSet::new();
        tokens.iter().filter(|t| seen.insert(t.as_str())).count()
    };
    let lexical_diversity = if word_count > 0 {
        unique_words as f64 / word_count as f64
    } else {
        0.0
    };
    let filler_count: i64 = FILLER_WORDS
        .iter()
        .map(|f| text_lower.matches(f).count() as i64)
        .sum();

    let kw_ratio = keyword_match_score(expected_keywords, &tokens);

    // Resume match: fraction of resume keywords present, else similarity of
    // the answer to the joined expected keywords.
    let mut res_ratio = 0.0;
    if !resume_keywords.is_empty() {
        let rw: Vec<String> = resume_keywords
            .iter()
            .filter(|r| r.trim().len() > 1)
            .map(|r| r.to_lowercase())
            .collect();
        if !rw.is_empty() {
            let present = rw
                .iter()
                .filter(|r| tokens.iter().any(|t| t.contains(r.as_str())))
                .count();
            res_ratio = present as f64 / rw.len().max(1) as f64;
        }
    } else if !expected_keywords.is_empty() {
        let joined = expected_keywords.join(" ").to_lowercase();
        res_ratio = similarity_ratio(&joined, &text_lower);
    }

    let tech_hits = TECH_TERMS
        .iter()
        .filter(|t| text_lower.contains(*t))
        .count() as i64;

    let depth = clamp100(
        (kw_ratio * 60.0 + tech_hits as f64 * 5.0 + lexical_diversity.min(1.0) * 20.0) as i64,
    );
    let technical =
        clamp100((kw_ratio * 70.0 + tech_hits as f64 * 7.0 + depth as f64 * 0.1) as i64);

    // Communication: lexical diversity + sentence structure, minus fillers,
    // with a small pacing adjustment when a spoken duration is known.
    let duration = transcript_meta.map(|m| m.duration);
    let wpm = match duration {
        Some(d) if d > 0.0 => Some(((word_count as f64 / d) * 60.0) as i64),
        _ => None,
    };
    let comm_base = clamp100(
        (lexical_diversity * 100.0 * 0.6 + (sentences as f64 / 3.0).min(1.0) * 40.0) as i64,
    );
    let comm_penalty = (filler_count * 4).min(30);
    let mut communication = (comm_base - comm_penalty).max(0);
    if let Some(wpm) = wpm {
        if (100..=200).contains(&wpm) {
            communication = (communication + 8).min(100);
        } else if wpm > 240 {
            communication = (communication - 8).max(0);
        }
    }

    let resume_match = (res_ratio * 100.0).min(100.0) as i64;
    let resume_bonus = (resume_match / 10).min(10);

    let overall = clamp100(
        (0.6 * technical as f64 + 0.3 * communication as f64 + 0.1 * resume_match as f64).round()
            as i64,
    );

    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    let mut tips = Vec::new();

    if technical > 65 {
        strengths.push("Good technical coverage".to_string());
    }
    if depth > 60 {
        strengths.push("Shows conceptual depth".to_string());
    }
    if communication > 60 {
        strengths.push("Clear communicator".to_string());
    }

    if technical < 40 {
        weaknesses.push("Weak technical details - expand on steps and algorithms".to_string());
        tips.push("Describe the design choices and algorithmic complexity (Big-O).".to_string());
    }
    if resume_match < 30 {
        weaknesses.push("Answer doesn't reference resume or project specifics".to_string());
        tips.push(
            "Link your answer to specific project tasks, numbers, or modules from your resume."
                .to_string(),
        );
    }
    if communication < 30 {
        weaknesses.push("Clarity and pacing issues".to_string());
        tips.push("Speak slower, organize answers: Problem -> Approach -> Result.".to_string());
    }

    ScoreResult {
        overall_score: overall,
        technical,
        communication,
        depth,
        resume_match,
        resume_bonus,
        strengths,
        weaknesses,
        tips,
        speech_meta: SpeechMeta {
            duration,
            wpm,
            filler_count,
            word_count,
            lexical_diversity: round3(lexical_diversity),
            sentence_count: sentences,
        },
        meta: ScoreMeta {
            keyword_ratio: round3(kw_ratio),
            tech_hits,
        },
    }
}

/// Coerces an LLM-supplied score map into a bounded [`ScoreResult`].
/// Malformed or out-of-range upstream values are never trusted: non-numeric
/// fields become 0, everything is clamped, list fields default to empty.
pub fn sanitize(value: &Value) -> ScoreResult {
    let overall = coerce_int(value.get("overall_score").or_else(|| value.get("score")));
    let technical = coerce_int(value.get("technical"));
    let communication = coerce_int(value.get("communication"));
    let depth = coerce_int(value.get("depth"));
    let resume_match = coerce_int(value.get("resume_match"));
    let resume_bonus = match value.get("resume_bonus") {
        Some(v) => coerce_raw(Some(v)).clamp(0, 10),
        None => (resume_match / 10).min(10),
    };

    ScoreResult {
        overall_score: overall,
        technical,
        communication,
        depth,
        resume_match,
        resume_bonus,
        strengths: string_list(value.get("strengths")),
        weaknesses: string_list(value.get("weaknesses")),
        tips: string_list(value.get("tips")),
        speech_meta: value
            .get("speech_meta")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default(),
        meta: value
            .get("meta")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default(),
    }
}

fn coerce_int(v: Option<&Value>) -> i64 {
    clamp100(coerce_raw(v))
}

fn coerce_raw(v: Option<&Value>) -> i64 {
    match v {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(|f| f as i64).unwrap_or(0),
        _ => 0,
    }
}

fn string_list(v: Option<&Value>) -> Vec<String> {
    v.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
