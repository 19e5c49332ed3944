use std::collections::HashMap;
use std::sync::Mutex;

/// Bounded memoization cache for raw LLM responses, keyed by (model, prompt).
///
/// Identical prompts are common for follow-up patterns, so a small cache
/// saves real latency. It is a performance optimization only: a hit and a
/// miss produce the same observable engine behavior, and nothing survives a
/// restart. Eviction is arbitrary (whatever key the map yields first), which
/// keeps memory stable without LRU bookkeeping.
pub struct ResponseCache {
    capacity: usize,
    entries: Mutex<HashMap<String, String>>,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn key(model: &str, prompt: &str) -> String {
        format!("{model}|{prompt}")
    }

    pub fn get(&self, model: &str, prompt: &str) -> Option<String> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        entries.get(&Self::key(model, prompt)).cloned()
    }

    pub fn put(&self, model: &str, prompt: &str, raw: String) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let key = Self::key(model, prompt);
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            if let Some(victim) = entries.keys().next().cloned() {
                entries.remove(&victim);
            }
        }
        entries.insert(key, raw);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_stored_value() {
        let cache = ResponseCache::new(4);
        cache.put("m", "p", "raw response".to_string());
        assert_eq!(cache.get("m", "p").as_deref(), Some("raw response"));
    }

    #[test]
    fn test_miss_on_different_model() {
        let cache = ResponseCache::new(4);
        cache.put("model-a", "p", "x".to_string());
        assert!(cache.get("model-b", "p").is_none());
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let cache = ResponseCache::new(3);
        for i in 0..10 {
            cache.put("m", &format!("prompt {i}"), format!("raw {i}"));
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_rewriting_existing_key_does_not_evict() {
        let cache = ResponseCache::new(2);
        cache.put("m", "a", "1".to_string());
        cache.put("m", "b", "2".to_string());
        cache.put("m", "a", "3".to_string());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("m", "a").as_deref(), Some("3"));
        assert_eq!(cache.get("m", "b").as_deref(), Some("2"));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = ResponseCache::new(0);
        cache.put("m", "p", "x".to_string());
        assert!(cache.is_empty());
        assert!(cache.get("m", "p").is_none());
    }
}
