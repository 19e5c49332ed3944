//! Prompt builders for the interview pipeline.
//!
//! Every prompt demands strict JSON so the response normalizer has a fair
//! chance; the normalizer still copes when the model ignores that.

/// Asks for a compact resume summary the question generator can reason over.
pub fn summarize_resume(resume_text: &str, truncate: usize) -> String {
    let trimmed: String = resume_text.chars().take(truncate).collect();
    format!(
        r#"You are an interviewer summarizing a candidate's resume.
Return STRICT JSON only with:
{{ "core_skills": ["skill1","skill2"], "projects": [{{"name":"p","tech":["t"],"role":"r"}}] }}

Resume:
"""{trimmed}"""
"#
    )
}

/// Resume-targeted question generation for a fresher-level candidate.
pub fn generate_questions(resume_summary: &str, max_questions: usize) -> String {
    let trimmed: String = resume_summary.chars().take(1200).collect();
    format!(
        r#"You are a calm, professional interviewer. The candidate is a FRESHER (recent graduate).

Based ONLY on this resume summary, produce up to {max_questions} simple, beginner-level questions.
Focus categories:
  - Resume project implementation details (what you did, libraries, challenges, metrics)
  - OOP basic concepts
  - DBMS basic concepts
  - OS basic concepts
  - Computer networks basic concepts

Keep each question short and clear (one sentence). Avoid complex system-design questions.

Return STRICT JSON:
{{ "questions": ["q1","q2", ...] }}

Resume summary:
"""{trimmed}"""
"#
    )
}

/// Full answer evaluation. All numeric fields must come back as 0-100 ints;
/// the scorer clamps them again regardless.
pub fn evaluate_answer(question: &str, answer: &str, resume_summary: &str) -> String {
    let short_resume: String = resume_summary.chars().take(1000).collect();
    format!(
        r#"You are a senior interviewer evaluating a FRESHER. Return STRICT JSON only:

{{ "overall_score": 0, "technical": 0, "communication": 0, "depth": 0, "resume_match": 0,
  "strengths": [], "weaknesses": [], "tips": [] }}

Question:
{question}

Candidate answer:
{answer}

Resume (short):
{short_resume}
"#
    )
}

/// Exactly one short conceptual follow-up question.
pub fn follow_up(question: &str, answer: &str) -> String {
    format!(
        r#"You are interviewing a fresher. Ask exactly ONE short follow-up to check conceptual clarity (not deep design).

Return STRICT JSON:
{{ "follow_up": "..." }}

Original question:
{question}

Candidate answer:
{answer}
"#
    )
}

/// Short exemplary answer plus a comparison against the candidate's answer.
pub fn expected_answer(question: &str, student_answer: &str) -> String {
    let q: String = question.chars().take(800).collect();
    let a: String = student_answer.chars().take(1200).collect();
    format!(
        r#"You are a senior interviewer producing a short, beginner-level expected answer for a fresher candidate.

Return STRICT JSON only:
{{ "expected_answer": "A concise (2-3 sentence) exemplary beginner-level answer.",
  "comparison": "A short (1-2 sentence) comparison noting strengths/missing points vs the candidate answer." }}

Question:
{q}

Candidate answer:
{a}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_truncates_resume() {
        let long = "x".repeat(5000);
        let prompt = summarize_resume(&long, 1500);
        assert!(prompt.len() < 2000);
        assert!(prompt.contains("core_skills"));
    }

    #[test]
    fn test_generate_mentions_question_budget() {
        let prompt = generate_questions("{\"core_skills\":[\"rust\"]}", 24);
        assert!(prompt.contains("up to 24"));
        assert!(prompt.contains("\"questions\""));
    }

    #[test]
    fn test_evaluate_embeds_question_and_answer() {
        let prompt = evaluate_answer("What is a thread?", "A unit of execution.", "");
        assert!(prompt.contains("What is a thread?"));
        assert!(prompt.contains("A unit of execution."));
        assert!(prompt.contains("overall_score"));
    }

    #[test]
    fn test_follow_up_requests_single_question() {
        let prompt = follow_up("q", "a");
        assert!(prompt.contains("ONE"));
        assert!(prompt.contains("follow_up"));
    }
}
