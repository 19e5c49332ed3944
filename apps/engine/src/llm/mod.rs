//! LLM collaborator — the single point of entry for model calls in the engine.
//!
//! ARCHITECTURAL RULE: no other module talks to the provider directly. Every
//! caller goes through [`LlmCall::invoke`], which never fails: timeouts,
//! transport errors, and non-success statuses all fold into a not-ok
//! [`LlmOutcome`], and the caller walks down its deterministic fallback.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::normalize;

pub mod cache;
pub mod prompts;

use cache::ResponseCache;

/// Result of one LLM call. `ok: false` means the external service was
/// unreachable, timed out, or answered with a non-success status; `parsed`
/// is a best-effort lenient JSON parse of `raw` and may be absent even when
/// the call itself succeeded.
#[derive(Debug, Clone, Default)]
pub struct LlmOutcome {
    pub ok: bool,
    pub raw: String,
    pub parsed: Option<Value>,
    pub error: Option<String>,
}

impl LlmOutcome {
    pub fn success(raw: String) -> Self {
        let parsed = normalize::parse_lenient(&raw);
        Self {
            ok: true,
            raw,
            parsed,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            raw: String::new(),
            parsed: None,
            error: Some(error.into()),
        }
    }
}

/// The LLM collaborator boundary. `model: None` selects the implementation's
/// default model; `timeout` is always caller-supplied so no call path can
/// block without a bound.
#[async_trait]
pub trait LlmCall: Send + Sync {
    async fn invoke(&self, prompt: &str, model: Option<&str>, timeout: Duration) -> LlmOutcome;
}

// ────────────────────────────────────────────────────────────────────────────
// OpenRouter-compatible chat-completions client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    /// Some providers answer with a bare text field instead of choices.
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Production [`LlmCall`] implementation over an OpenRouter-compatible
/// chat-completions endpoint. Owns a bounded response cache so identical
/// (prompt, model) calls within a process lifetime are memoized.
pub struct OpenRouterClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
    default_model: String,
    cache: Arc<ResponseCache>,
}

impl OpenRouterClient {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_cache(config, Arc::new(ResponseCache::new(config.cache_capacity)))
    }

    /// Injectable-cache constructor, used when the owner wants to share or
    /// inspect the cache.
    pub fn with_cache(config: &EngineConfig, cache: Arc<ResponseCache>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: config.openrouter_url.clone(),
            api_key: config.openrouter_api_key.clone(),
            default_model: config.model.clone(),
            cache,
        }
    }

    async fn call_remote(&self, prompt: &str, model: &str, timeout: Duration) -> Result<String, String> {
        if self.api_key.is_empty() {
            return Err("OPENROUTER_API_KEY not configured".to_string());
        }

        let body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };

        let response = self
            .http
            .post(&self.url)
            .timeout(timeout)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("timeout ({}s) hitting LLM provider", timeout.as_secs())
                } else {
                    format!("connection error reaching LLM provider: {e}")
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(1000).collect();
            return Err(format!("HTTP {status} from LLM provider: {snippet}"));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| format!("unreadable LLM provider response: {e}"))?;

        if let Some(content) = parsed
            .choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
        {
            return Ok(content.trim().to_string());
        }
        if let Some(text) = parsed.response {
            return Ok(text.trim().to_string());
        }
        Err("unexpected LLM provider response shape".to_string())
    }
}

#[async_trait]
impl LlmCall for OpenRouterClient {
    async fn invoke(&self, prompt: &str, model: Option<&str>, timeout: Duration) -> LlmOutcome {
        let model = model.unwrap_or(&self.default_model);

        if let Some(raw) = self.cache.get(model, prompt) {
            debug!(model, "LLM cache hit");
            return LlmOutcome::success(raw);
        }

        match self.call_remote(prompt, model, timeout).await {
            Ok(raw) => {
                self.cache.put(model, prompt, raw.clone());
                let outcome = LlmOutcome::success(raw);
                if outcome.parsed.is_none() {
                    debug!(model, "LLM responded but JSON parsing failed");
                }
                outcome
            }
            Err(e) => {
                warn!(model, error = %e, "LLM call failed");
                LlmOutcome::failure(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_outcome_attaches_lenient_parse() {
        let outcome = LlmOutcome::success("```json\n{\"follow_up\": \"why?\"}\n```".to_string());
        assert!(outcome.ok);
        let parsed = outcome.parsed.expect("fenced JSON should parse");
        assert_eq!(parsed["follow_up"], "why?");
    }

    #[test]
    fn test_success_outcome_tolerates_unparseable_text() {
        let outcome = LlmOutcome::success("I cannot answer that".to_string());
        assert!(outcome.ok);
        assert!(outcome.parsed.is_none());
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_failure_outcome_carries_error() {
        let outcome = LlmOutcome::failure("timeout (8s) hitting LLM provider");
        assert!(!outcome.ok);
        assert!(outcome.parsed.is_none());
        assert!(outcome.error.unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn test_missing_api_key_degrades_to_not_ok() {
        let client = OpenRouterClient::new(&EngineConfig::default());
        let outcome = client
            .invoke("hello", None, Duration::from_secs(1))
            .await;
        assert!(!outcome.ok);
        assert!(outcome.error.unwrap().contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn test_chat_response_deserializes_both_shapes() {
        let choices = r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(choices).unwrap();
        assert_eq!(
            parsed.choices[0].message.as_ref().unwrap().content.as_deref(),
            Some("hi")
        );

        let bare = r#"{"response":"hi"}"#;
        let parsed: ChatResponse = serde_json::from_str(bare).unwrap();
        assert_eq!(parsed.response.as_deref(), Some("hi"));
    }
}
