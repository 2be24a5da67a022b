//! Concurrency-safe memoization of compiled regular expressions.
//!
//! Routes frequently share constraint patterns (`[0-9]+`, `[^/]+`, ...). The
//! cache maps pattern text to a shared `Arc<Regex>` so identical patterns are
//! compiled once per cache. It is an explicit object owned by a router tree
//! rather than a process global, so tests can scope their own.
//!
//! Concurrent first uses of the same pattern may both compile; the loser's
//! result is discarded and both callers receive the stored entry.

use std::sync::Arc;

use dashmap::DashMap;
use regex::Regex;
use tracing::debug;

/// Get-or-insert cache from pattern text to compiled regex.
#[derive(Debug, Clone)]
pub struct PatternCache {
    entries: Arc<DashMap<String, Arc<Regex>>>,
    enabled: bool,
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternCache {
    /// Create an empty, enabled cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            enabled: true,
        }
    }

    /// A cache that never stores anything; every lookup compiles afresh.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            enabled: false,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return the compiled regex for `pattern`, compiling it on first use.
    pub fn get_or_compile(&self, pattern: &str) -> Result<Arc<Regex>, regex::Error> {
        if !self.enabled {
            return Regex::new(pattern).map(Arc::new);
        }
        if let Some(hit) = self.entries.get(pattern) {
            return Ok(Arc::clone(hit.value()));
        }

        let compiled = Arc::new(Regex::new(pattern)?);
        debug!(pattern = %pattern, cached = self.entries.len(), "Compiled new pattern");
        let stored = self
            .entries
            .entry(pattern.to_string())
            .or_insert(compiled);
        Ok(Arc::clone(stored.value()))
    }

    /// Number of distinct patterns stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_identical_patterns_share_one_regex() {
        let cache = PatternCache::new();
        let a = cache.get_or_compile("^[0-9]+$").unwrap();
        let b = cache.get_or_compile("^[0-9]+$").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalid_pattern_is_not_stored() {
        let cache = PatternCache::new();
        assert!(cache.get_or_compile("([").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_disabled_cache_compiles_every_time() {
        let cache = PatternCache::disabled();
        let a = cache.get_or_compile("^a$").unwrap();
        let b = cache.get_or_compile("^a$").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_first_use() {
        let cache = PatternCache::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || cache.get_or_compile("^[a-z]+-[0-9]+$").unwrap())
            })
            .collect();
        let compiled: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(cache.len(), 1);
        let stored = cache.get_or_compile("^[a-z]+-[0-9]+$").unwrap();
        assert!(compiled.iter().all(|r| r.as_str() == stored.as_str()));
    }
}
