use std::time::Duration;

use anyhow::{Context, Result};

/// Engine configuration loaded from environment variables.
///
/// Every knob has a default so the engine runs without a `.env`; only the
/// API key is genuinely required to reach a real LLM, and even then a
/// missing key degrades to the deterministic fallbacks rather than failing.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub openrouter_url: String,
    pub openrouter_api_key: String,
    /// Model for heavier tasks (full answer evaluation).
    pub model: String,
    /// Smaller model for follow-ups and other quick tasks.
    pub fast_model: String,
    /// Default timeout: expected-answer generation.
    pub timeout: Duration,
    /// Short timeout: summarize, generate, follow-up.
    pub timeout_short: Duration,
    /// Long timeout: full answer evaluation.
    pub timeout_long: Duration,
    /// When false, answer scoring skips the LLM and goes straight to the
    /// heuristic scorer.
    pub force_llm_eval: bool,
    /// Capacity of the bounded (prompt, model) response cache.
    pub cache_capacity: usize,
    /// Character budget for resume text handed to the summarize prompt.
    pub summary_truncate: usize,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(EngineConfig {
            openrouter_url: env_or(
                "OPENROUTER_URL",
                "https://openrouter.ai/api/v1/chat/completions",
            ),
            openrouter_api_key: env_or("OPENROUTER_API_KEY", ""),
            model: env_or("OPENROUTER_MODEL", "meta-llama/llama-3.3-70b-instruct"),
            fast_model: env_or("OPENROUTER_FAST_MODEL", "mistral-small"),
            timeout: Duration::from_secs(parse_env("LLM_TIMEOUT", 40)?),
            timeout_short: Duration::from_secs(parse_env("LLM_TIMEOUT_SHORT", 8)?),
            timeout_long: Duration::from_secs(parse_env("LLM_TIMEOUT_LONG", 90)?),
            force_llm_eval: env_flag("LLM_FORCE_EVAL"),
            cache_capacity: parse_env("LLM_CACHE_CAPACITY", 256)? as usize,
            summary_truncate: parse_env("SUMMARY_TRUNCATE", 1500)? as usize,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            openrouter_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            openrouter_api_key: String::new(),
            model: "meta-llama/llama-3.3-70b-instruct".to_string(),
            fast_model: "mistral-small".to_string(),
            timeout: Duration::from_secs(40),
            timeout_short: Duration::from_secs(8),
            timeout_long: Duration::from_secs(90),
            force_llm_eval: false,
            cache_capacity: 256,
            summary_truncate: 1500,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str) -> bool {
    matches!(
        std::env::var(key).unwrap_or_default().to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn parse_env(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(v) => v
            .parse::<u64>()
            .with_context(|| format!("{key} must be a non-negative integer")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.timeout_short, Duration::from_secs(8));
        assert_eq!(cfg.timeout_long, Duration::from_secs(90));
        assert_eq!(cfg.cache_capacity, 256);
    }

    #[test]
    fn test_llm_eval_disabled_by_default() {
        assert!(!EngineConfig::default().force_llm_eval);
    }
}
