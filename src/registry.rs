//! Route registration and resolution
//!
//! Routes are registered per namespace. The empty string is the default
//! namespace; nested routers usually pick their own. Each namespace keeps its
//! matchers in registration order plus an optional `$default` fallback.
//!
//! # Example
//!
//! ```
//! use history_router::{Route, RouteContext, RouteRegistry};
//!
//! struct Home;
//! impl Route for Home {
//!     fn create(_cx: &RouteContext<'_>) -> Self {
//!         Home
//!     }
//! }
//!
//! let mut registry = RouteRegistry::new();
//! registry.register::<Home>("", "/").unwrap();
//! registry.register::<Home>("", "$default").unwrap();
//!
//! assert!(registry.resolve("", "/").is_some());
//! assert!(registry.resolve("", "/anything").unwrap().is_default());
//! ```

#[cfg(feature = "cache")]
use crate::cache::{CacheStats, RouteCache};
use crate::diagnostics::{report, Diagnostic};
use crate::error::PatternError;
use crate::matcher::PathMatcher;
use crate::route::{Route, RouteContext, RouteTarget};
use crate::{debug_log, trace_log};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Registry shared between routers.
pub type SharedRegistry = Arc<RwLock<RouteRegistry>>;

#[derive(Debug, Default)]
struct Namespace {
    matchers: Vec<Arc<PathMatcher>>,
    default: Option<Arc<PathMatcher>>,
}

/// Outcome of one resolution, kept together with the anomaly it raised.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub matcher: Option<Arc<PathMatcher>>,
    pub diagnostic: Option<Diagnostic>,
}

impl Resolution {
    /// Report the recorded anomaly, if any, and hand out the matcher.
    fn replay(self) -> Option<Arc<PathMatcher>> {
        if let Some(diagnostic) = self.diagnostic {
            report(diagnostic);
        }
        self.matcher
    }
}

/// Per-namespace route table.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    namespaces: BTreeMap<String, Namespace>,
    #[cfg(feature = "cache")]
    cache: parking_lot::Mutex<RouteCache>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry routers use unless given another one.
    pub fn global() -> SharedRegistry {
        static GLOBAL: OnceLock<SharedRegistry> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| RouteRegistry::new().into_shared()))
    }

    /// Wrap for sharing between routers.
    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Register route type `R` for `pattern` in `namespace`.
    pub fn register<R: Route>(
        &mut self,
        namespace: &str,
        pattern: &str,
    ) -> Result<Arc<PathMatcher>, PatternError> {
        self.register_target(namespace, pattern, RouteTarget::of::<R>())
    }

    /// Register a route built by `factory` under the display name `name`.
    pub fn register_with<F>(
        &mut self,
        namespace: &str,
        pattern: &str,
        name: &'static str,
        factory: F,
    ) -> Result<Arc<PathMatcher>, PatternError>
    where
        F: Fn(&RouteContext<'_>) -> Box<dyn Route> + Send + Sync + 'static,
    {
        self.register_target(namespace, pattern, RouteTarget::from_factory(name, factory))
    }

    /// Register a prepared target.
    ///
    /// A second `$default` in the same namespace replaces the first and is
    /// reported as [`Diagnostic::DuplicateDefault`].
    pub fn register_target(
        &mut self,
        namespace: &str,
        pattern: &str,
        target: RouteTarget,
    ) -> Result<Arc<PathMatcher>, PatternError> {
        let matcher = Arc::new(PathMatcher::compile(pattern, target)?);
        debug_log!(
            "Registering [{}] {} -> {}",
            namespace,
            pattern,
            matcher.target().type_name()
        );

        let entry = self.namespaces.entry(namespace.to_string()).or_default();
        if matcher.is_default() {
            if entry.default.is_some() {
                report(Diagnostic::DuplicateDefault {
                    namespace: namespace.to_string(),
                });
            }
            entry.default = Some(Arc::clone(&matcher));
        } else {
            entry.matchers.push(Arc::clone(&matcher));
        }

        self.invalidate_cache();
        Ok(matcher)
    }

    /// Find the matcher for `path` in `namespace`.
    ///
    /// When several patterns match, the last registered one wins and the
    /// ambiguity is reported. Without any match the namespace default is used.
    /// Anomalies are reported on every call, cached or not.
    pub fn resolve(&self, namespace: &str, path: &str) -> Option<Arc<PathMatcher>> {
        #[cfg(feature = "cache")]
        if let Some(cached) = self.cache.lock().get(namespace, path) {
            return cached.replay();
        }

        let resolution = self.resolve_uncached(namespace, path);

        #[cfg(feature = "cache")]
        self.cache.lock().insert(namespace, path, resolution.clone());

        resolution.replay()
    }

    fn resolve_uncached(&self, namespace: &str, path: &str) -> Resolution {
        let Some(entry) = self.namespaces.get(namespace) else {
            return Resolution {
                matcher: None,
                diagnostic: Some(Diagnostic::UnknownNamespace {
                    namespace: namespace.to_string(),
                }),
            };
        };

        let matches: Vec<&Arc<PathMatcher>> = entry
            .matchers
            .iter()
            .filter(|matcher| matcher.test(path))
            .collect();

        let diagnostic = (matches.len() > 1).then(|| Diagnostic::AmbiguousMatch {
            namespace: namespace.to_string(),
            path: path.to_string(),
            matches: matches.len(),
        });

        let matcher = matches.last().map(|matcher| Arc::clone(matcher));
        let matcher = matcher.or_else(|| entry.default.clone());
        trace_log!(
            "Resolved '{}' in '{}' to {:?}",
            path,
            namespace,
            matcher.as_ref().map(|matcher| matcher.pattern())
        );
        Resolution {
            matcher,
            diagnostic,
        }
    }

    /// Remove the routes of one namespace, or of all namespaces.
    pub fn clear(&mut self, namespace: Option<&str>) {
        match namespace {
            Some(namespace) => {
                self.namespaces.remove(namespace);
            }
            None => self.namespaces.clear(),
        }
        self.invalidate_cache();
    }

    /// Human readable registration table, one `[namespace] pattern -> Type`
    /// line per registration.
    pub fn describe(&self) -> Vec<String> {
        self.namespaces
            .iter()
            .flat_map(|(name, entry)| {
                entry
                    .default
                    .iter()
                    .chain(entry.matchers.iter())
                    .map(move |matcher| {
                        format!(
                            "[{}] {} -> {}",
                            name,
                            matcher.pattern(),
                            matcher.target().type_name()
                        )
                    })
            })
            .collect()
    }

    /// Number of registrations, defaults included.
    pub fn len(&self) -> usize {
        self.namespaces
            .values()
            .map(|entry| entry.matchers.len() + usize::from(entry.default.is_some()))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    #[cfg(feature = "cache")]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats().clone()
    }

    fn invalidate_cache(&mut self) {
        #[cfg(feature = "cache")]
        self.cache.get_mut().invalidate();
    }
}

impl fmt::Display for RouteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.describe() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
