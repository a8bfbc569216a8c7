//! Compiled query cache.

use super::ast::CompiledQuery;
use crate::error::CoreResult;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that compiled.
    pub misses: u64,
    /// Entries currently held.
    pub entries: usize,
}

#[derive(Debug, Default)]
struct Entries {
    by_source: HashMap<String, Arc<CompiledQuery>>,
    /// Insertion order; the front is evicted first.
    order: VecDeque<String>,
}

/// Bounded cache of compiled queries keyed by query text.
///
/// Compilation runs outside the lock, so two threads missing on the same
/// text may both compile; the second insert is dropped.
#[derive(Debug)]
pub struct QueryCache {
    capacity: usize,
    entries: Mutex<Entries>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    /// Creates a cache holding at most `capacity` queries. Zero disables caching.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Entries::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached query for `source`, compiling and caching it on a miss.
    ///
    /// # Errors
    ///
    /// Returns the compile error; failures are not cached.
    pub fn get_or_compile<F>(&self, source: &str, compile: F) -> CoreResult<Arc<CompiledQuery>>
    where
        F: FnOnce() -> CoreResult<CompiledQuery>,
    {
        if let Some(hit) = self.entries.lock().by_source.get(source) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(hit));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let compiled = Arc::new(compile()?);
        if self.capacity == 0 {
            return Ok(compiled);
        }

        let mut entries = self.entries.lock();
        if !entries.by_source.contains_key(source) {
            while entries.order.len() >= self.capacity {
                if let Some(oldest) = entries.order.pop_front() {
                    entries.by_source.remove(&oldest);
                }
            }
            entries.order.push_back(source.to_string());
            entries
                .by_source
                .insert(source.to_string(), Arc::clone(&compiled));
        }
        Ok(compiled)
    }

    /// Drops every cached query.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.by_source.clear();
        entries.order.clear();
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.lock().by_source.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn compiled(source: &str) -> CompiledQuery {
        CompiledQuery {
            source: source.to_string(),
            entity_type: "Order".into(),
            collection: "ORDER".into(),
            predicate: None,
        }
    }

    #[test]
    fn second_lookup_hits() {
        let cache = QueryCache::new(4);
        let a = cache.get_or_compile("q1", || Ok(compiled("q1"))).unwrap();
        let b = cache
            .get_or_compile("q1", || panic!("should not recompile"))
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn oldest_entry_is_evicted() {
        let cache = QueryCache::new(2);
        for q in ["q1", "q2", "q3"] {
            cache.get_or_compile(q, || Ok(compiled(q))).unwrap();
        }
        assert_eq!(cache.stats().entries, 2);

        let mut recompiled = false;
        cache
            .get_or_compile("q1", || {
                recompiled = true;
                Ok(compiled("q1"))
            })
            .unwrap();
        assert!(recompiled);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = QueryCache::new(2);
        let result = cache.get_or_compile("bad", || Err(CoreError::invalid_query(0, "nope")));
        assert!(result.is_err());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let cache = QueryCache::new(0);
        cache.get_or_compile("q1", || Ok(compiled("q1"))).unwrap();
        assert_eq!(cache.stats().entries, 0);
        cache.clear();
    }
}
