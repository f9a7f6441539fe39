//! In-memory response cache for the local engine.

use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashMap;
use tracing::debug;

/// Cache key: prompt plus the already clamped generation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    prompt: String,
    max_length: u32,
    temperature_bits: u32,
}

impl CacheKey {
    pub fn new(prompt: &str, max_length: u32, temperature: f32) -> Self {
        Self {
            prompt: prompt.to_string(),
            max_length,
            temperature_bits: temperature.to_bits(),
        }
    }
}

/// Concurrent map from [`CacheKey`] to generated text.
///
/// Unbounded by default. With a capacity, the oldest insertion is evicted
/// first.
pub struct ResponseCache {
    entries: DashMap<CacheKey, String>,
    order: Mutex<VecDeque<CacheKey>>,
    capacity: Option<usize>,
}

impl ResponseCache {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn get(&self, key: &CacheKey) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: CacheKey, value: String) {
        let Some(capacity) = self.capacity else {
            self.entries.insert(key, value);
            return;
        };
        if capacity == 0 {
            return;
        }

        let mut order = self.order.lock().unwrap_or_else(|e| e.into_inner());
        if self.entries.insert(key.clone(), value).is_none() {
            order.push_back(key);
        }
        while order.len() > capacity {
            if let Some(oldest) = order.pop_front() {
                self.entries.remove(&oldest);
                debug!("Evicted cached response ({} entries)", order.len());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_distinguishes_parameters() {
        let cache = ResponseCache::unbounded();
        cache.insert(CacheKey::new("p", 10, 0.5), "a".to_string());

        assert_eq!(cache.get(&CacheKey::new("p", 10, 0.5)).as_deref(), Some("a"));
        assert!(cache.get(&CacheKey::new("p", 11, 0.5)).is_none());
        assert!(cache.get(&CacheKey::new("p", 10, 0.6)).is_none());
    }

    #[test]
    fn test_unbounded_keeps_everything() {
        let cache = ResponseCache::unbounded();
        for i in 0..100 {
            cache.insert(CacheKey::new(&i.to_string(), 10, 0.5), i.to_string());
        }
        assert_eq!(cache.len(), 100);
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let cache = ResponseCache::new(Some(2));
        cache.insert(CacheKey::new("a", 10, 0.5), "1".to_string());
        cache.insert(CacheKey::new("b", 10, 0.5), "2".to_string());
        cache.insert(CacheKey::new("a", 10, 0.5), "1'".to_string());
        cache.insert(CacheKey::new("c", 10, 0.5), "3".to_string());

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&CacheKey::new("a", 10, 0.5)).is_none());
        assert_eq!(cache.get(&CacheKey::new("b", 10, 0.5)).as_deref(), Some("2"));
        assert_eq!(cache.get(&CacheKey::new("c", 10, 0.5)).as_deref(), Some("3"));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = ResponseCache::new(Some(0));
        cache.insert(CacheKey::new("a", 10, 0.5), "1".to_string());
        assert!(cache.is_empty());
    }
}
