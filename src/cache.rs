//! Route resolution caching
//!
//! Resolving a path walks every matcher of a namespace. Results, including
//! "no match", are cached per `(namespace, path)` with LRU eviction, together
//! with the anomaly the resolution raised. Any registration change
//! invalidates the whole cache.

use crate::registry::Resolution;
use crate::trace_log;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Cache key for a resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolutionKey {
    namespace: String,
    path: String,
}

/// Cache performance statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invalidations: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Resolution cache with LRU eviction
///
/// Default capacity: 1000 entries.
#[derive(Debug)]
pub struct RouteCache {
    entries: LruCache<ResolutionKey, Resolution>,
    stats: CacheStats,
}

impl RouteCache {
    const DEFAULT_CAPACITY: usize = 1000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(cap),
            stats: CacheStats::default(),
        }
    }

    /// Look up a cached resolution.
    ///
    pub fn get(&mut self, namespace: &str, path: &str) -> Option<Resolution> {
        let key = ResolutionKey {
            namespace: namespace.to_string(),
            path: path.to_string(),
        };
        if let Some(entry) = self.entries.get(&key) {
            self.stats.hits += 1;
            trace_log!("Resolution cache hit for '{}' in '{}'", path, namespace);
            Some(entry.clone())
        } else {
            self.stats.misses += 1;
            trace_log!("Resolution cache miss for '{}' in '{}'", path, namespace);
            None
        }
    }

    pub fn insert(&mut self, namespace: &str, path: &str, resolved: Resolution) {
        self.entries.push(
            ResolutionKey {
                namespace: namespace.to_string(),
                path: path.to_string(),
            },
            resolved,
        );
    }

    /// Drop every cached resolution.
    pub fn invalidate(&mut self) {
        trace_log!("Clearing route resolution cache");
        self.entries.clear();
        self.stats.invalidations += 1;
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RouteCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;
    use crate::matcher::PathMatcher;
    use crate::route::{Route, RouteContext, RouteTarget};
    use std::sync::Arc;

    struct Home;

    impl Route for Home {
        fn create(_cx: &RouteContext<'_>) -> Self {
            Home
        }
    }

    fn matcher(pattern: &str) -> Arc<PathMatcher> {
        Arc::new(PathMatcher::compile(pattern, RouteTarget::of::<Home>()).unwrap())
    }

    fn resolved(matcher: Option<Arc<PathMatcher>>) -> Resolution {
        Resolution {
            matcher,
            diagnostic: None,
        }
    }

    fn unresolved() -> Resolution {
        resolved(None)
    }

    #[test]
    fn test_cache_creation() {
        let cache = RouteCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_cache_miss() {
        let mut cache = RouteCache::new();
        assert!(cache.get("", "/dashboard").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_cache_hit_keeps_identity() {
        let mut cache = RouteCache::new();
        let home = matcher("/");
        cache.insert("", "/", resolved(Some(Arc::clone(&home))));
        cache.insert("", "/missing", unresolved());

        let hit = cache.get("", "/").unwrap().matcher.unwrap();
        assert!(Arc::ptr_eq(&hit, &home));
        assert!(cache.get("", "/missing").unwrap().matcher.is_none());
        assert!(cache.get("other", "/").is_none());
        assert_eq!(cache.stats().hits, 2);
    }

    #[test]
    fn test_cache_invalidate() {
        let mut cache = RouteCache::new();
        cache.insert("", "/", resolved(Some(matcher("/"))));
        assert_eq!(cache.len(), 1);

        cache.invalidate();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[test]
    fn test_cache_keeps_diagnostic() {
        let mut cache = RouteCache::new();
        let unknown = Diagnostic::UnknownNamespace {
            namespace: "pages".to_string(),
        };
        cache.insert(
            "pages",
            "x",
            Resolution {
                matcher: None,
                diagnostic: Some(unknown.clone()),
            },
        );

        let hit = cache.get("pages", "x").unwrap();
        assert_eq!(hit.diagnostic, Some(unknown));
        assert!(hit.matcher.is_none());
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = RouteCache::with_capacity(2);
        cache.insert("", "/a", unresolved());
        cache.insert("", "/b", unresolved());
        cache.get("", "/a");
        cache.insert("", "/c", unresolved());

        assert!(cache.get("", "/b").is_none());
        assert!(cache.get("", "/a").is_some());
    }

    #[test]
    fn test_hit_rate_calculation() {
        let mut cache = RouteCache::new();
        cache.get("", "/a");
        cache.get("", "/b");
        cache.get("", "/c");

        cache.insert("", "/a", unresolved());
        cache.insert("", "/b", unresolved());

        cache.get("", "/a");
        cache.get("", "/b");

        assert_eq!(cache.stats().hits, 2);
        assert_eq!(cache.stats().misses, 3);
        assert!((cache.stats().hit_rate() - 0.4).abs() < 0.001);
    }
}
