//! Session aggregator — reduces all answer records of a session into the
//! final analysis report.
//!
//! Ranking uses first-seen order to break frequency ties, so re-running
//! finish against an unchanged answer list yields an identical report.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::session::AnswerRecord;

const TOP_STRENGTHS: usize = 5;
const TOP_WEAKNESSES: usize = 8;
const TOP_TIPS: usize = 8;

/// Improvement-tip thresholds: below the threshold gets the "needs work"
/// message, at or above gets the "doing fine" one.
const TECHNICAL_THRESHOLD: i64 = 60;
const COMMUNICATION_THRESHOLD: i64 = 60;
const DEPTH_THRESHOLD: i64 = 50;
const RESUME_MATCH_THRESHOLD: i64 = 50;

/// Fixed 4-phase study plan attached to every analysis; not data-derived.
const STUDY_PLAN: [&str; 4] = [
    "Week 1 - Data Structures & Algorithms: practice 10 problems and explain approach & complexity.",
    "Week 2 - Databases & Caching: indexing, query tuning, read replica basics, simple caching examples.",
    "Week 3 - OOP & Testing: SOLID principles, patterns, unit tests and small refactors.",
    "Week 4 - OS & Networks fundamentals: processes, threads, basic socket programming and mock interviews.",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAverages {
    pub technical_avg: i64,
    pub communication_avg: i64,
    pub depth_avg: i64,
    pub resume_match_avg: i64,
}

/// The final per-session report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub overall_score: i64,
    pub by_category: CategoryAverages,
    pub top_strengths: Vec<String>,
    pub top_weaknesses: Vec<String>,
    pub aggregated_tips: Vec<String>,
    /// Exactly four entries, one per category.
    pub improvement_tips: Vec<String>,
    pub actionable_from_weaknesses: Vec<String>,
    pub suggested_4_week_plan: Vec<String>,
    pub detailed_per_answer: Vec<AnswerRecord>,
}

/// Frequency-counts strings preserving first-seen order, then ranks by
/// descending count. The stable sort keeps ties deterministic.
fn ranked<'a>(items: impl Iterator<Item = &'a String>, top: usize) -> Vec<String> {
    let mut counts: Vec<(&'a String, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(s, _)| *s == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(top).map(|(s, _)| s.clone()).collect()
}

fn floor_avg(values: impl Iterator<Item = i64>) -> i64 {
    let (sum, n) = values.fold((0i64, 0i64), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0
    } else {
        sum.div_euclid(n)
    }
}

/// Reduces a non-empty answer list into an [`Analysis`]. An empty list is a
/// validation error: there is nothing to report on.
pub fn analyze(answers: &[AnswerRecord]) -> Result<Analysis, EngineError> {
    if answers.is_empty() {
        return Err(EngineError::Validation("No answers submitted".to_string()));
    }

    let overall_score = floor_avg(answers.iter().map(|a| a.score.overall_score));
    let by_category = CategoryAverages {
        technical_avg: floor_avg(answers.iter().map(|a| a.score.technical)),
        communication_avg: floor_avg(answers.iter().map(|a| a.score.communication)),
        depth_avg: floor_avg(answers.iter().map(|a| a.score.depth)),
        resume_match_avg: floor_avg(answers.iter().map(|a| a.score.resume_match)),
    };

    let top_strengths = ranked(
        answers.iter().flat_map(|a| a.score.strengths.iter()),
        TOP_STRENGTHS,
    );
    let top_weaknesses = ranked(
        answers.iter().flat_map(|a| a.score.weaknesses.iter()),
        TOP_WEAKNESSES,
    );
    let aggregated_tips = ranked(answers.iter().flat_map(|a| a.score.tips.iter()), TOP_TIPS);

    let improvement_tips = vec![
        if by_category.technical_avg < TECHNICAL_THRESHOLD {
            "Strengthen core technical knowledge: DS & algorithms and system basics. Practice explaining complexity."
        } else {
            "Technical fundamentals look solid - focus on concise tradeoffs and benchmarks."
        }
        .to_string(),
        if by_category.communication_avg < COMMUNICATION_THRESHOLD {
            "Work on structured answers: use STAR / Problem-Approach-Result format and practice clear speech (aim 120-160 wpm)."
        } else {
            "Communication is good - reduce filler words under time pressure."
        }
        .to_string(),
        if by_category.depth_avg < DEPTH_THRESHOLD {
            "Provide deeper design and edge-case reasoning where applicable."
        } else {
            "Depth is acceptable - add concrete examples or micro-optimizations."
        }
        .to_string(),
        if by_category.resume_match_avg < RESUME_MATCH_THRESHOLD {
            "Tie answers explicitly to resume projects and outcomes."
        } else {
            "Good resume alignment - continue referencing modules and metrics."
        }
        .to_string(),
    ];

    let actionable_from_weaknesses = top_weaknesses
        .iter()
        .take(TOP_STRENGTHS)
        .map(|w| format!("{w} - practice short Q&A and prepare one concrete example next time."))
        .collect();

    Ok(Analysis {
        overall_score,
        by_category,
        top_strengths,
        top_weaknesses,
        aggregated_tips,
        improvement_tips,
        actionable_from_weaknesses,
        suggested_4_week_plan: STUDY_PLAN.iter().map(|s| s.to_string()).collect(),
        detailed_per_answer: answers.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoreResult;

    fn record(overall: i64, strengths: &[&str], weaknesses: &[&str]) -> AnswerRecord {
        AnswerRecord {
            question_index: 0,
            question: "q".to_string(),
            answer: "a".to_string(),
            score: ScoreResult {
                overall_score: overall,
                technical: overall,
                communication: overall,
                depth: overall,
                resume_match: overall,
                strengths: strengths.iter().map(|s| s.to_string()).collect(),
                weaknesses: weaknesses.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
            transcript_meta: None,
        }
    }

    #[test]
    fn test_empty_answer_list_is_rejected() {
        let err = analyze(&[]).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_averages_floor() {
        let answers = vec![record(70, &[], &[]), record(75, &[], &[])];
        let analysis = analyze(&answers).unwrap();
        // (70 + 75) / 2 = 72.5 -> 72
        assert_eq!(analysis.overall_score, 72);
        assert_eq!(analysis.by_category.technical_avg, 72);
    }

    #[test]
    fn test_frequency_ranking_and_caps() {
        let mut answers = Vec::new();
        for _ in 0..3 {
            answers.push(record(50, &["clear"], &["short answers"]));
        }
        answers.push(record(50, &["deep", "clear"], &["w1", "w2", "w3", "w4", "w5", "w6", "w7", "w8"]));
        let analysis = analyze(&answers).unwrap();
        assert_eq!(analysis.top_strengths[0], "clear");
        assert!(analysis.top_strengths.len() <= 5);
        assert_eq!(analysis.top_weaknesses[0], "short answers");
        assert_eq!(analysis.top_weaknesses.len(), 8);
    }

    #[test]
    fn test_exactly_four_improvement_tips() {
        let analysis = analyze(&[record(10, &[], &[])]).unwrap();
        assert_eq!(analysis.improvement_tips.len(), 4);
        assert!(analysis.improvement_tips[0].contains("Strengthen core technical"));
    }

    #[test]
    fn test_improvement_tips_flip_at_thresholds() {
        let low = analyze(&[record(49, &[], &[])]).unwrap();
        let high = analyze(&[record(60, &[], &[])]).unwrap();
        assert!(low.improvement_tips[2].contains("deeper design"));
        assert!(high.improvement_tips[0].contains("look solid"));
        assert!(high.improvement_tips[3].contains("Good resume alignment"));
    }

    #[test]
    fn test_actionable_items_track_top_weaknesses() {
        let answers = vec![record(50, &[], &["missed keywords", "pacing"])];
        let analysis = analyze(&answers).unwrap();
        assert_eq!(analysis.actionable_from_weaknesses.len(), 2);
        assert!(analysis.actionable_from_weaknesses[0].starts_with("missed keywords"));
    }

    #[test]
    fn test_study_plan_is_fixed_four_phases() {
        let analysis = analyze(&[record(80, &[], &[])]).unwrap();
        assert_eq!(analysis.suggested_4_week_plan.len(), 4);
        assert!(analysis.suggested_4_week_plan[0].starts_with("Week 1"));
    }

    #[test]
    fn test_per_answer_detail_echoed_verbatim() {
        let answers = vec![record(42, &["s"], &["w"]), record(58, &[], &[])];
        let analysis = analyze(&answers).unwrap();
        assert_eq!(analysis.detailed_per_answer, answers);
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let answers = vec![
            record(60, &["clear", "deep"], &["pacing"]),
            record(40, &["clear"], &["pacing", "keywords"]),
        ];
        let first = analyze(&answers).unwrap();
        let second = analyze(&answers).unwrap();
        assert_eq!(first, second);
    }
}
