//! Render-tree context
//!
//! A [`Scope`] is what a view subtree can see of its surroundings: arbitrary
//! context values keyed by type, plus a handle to the innermost active router.
//! Each router forks its parent scope and installs its own [`RouterHandle`],
//! so nested routers and links always talk to the closest router while still
//! seeing every value provided further up.

use crate::error::{RouterError, RouterResult};
use crate::registry::SharedRegistry;
use crate::synchronizer::{SharedHistory, Transition};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

// ============================================================================
// Scope
// ============================================================================

/// Context values visible to a view subtree.
///
/// # Example
///
/// ```
/// use history_router::Scope;
///
/// struct Theme(&'static str);
///
/// let scope = Scope::new().with(Theme("dark"));
/// assert_eq!(scope.get::<Theme>().map(|theme| theme.0), Some("dark"));
/// assert!(scope.router().is_none());
/// ```
#[derive(Clone, Default)]
pub struct Scope {
    values: HashMap<TypeId, Rc<dyn Any>>,
    router: Option<RouterHandle>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide `value` to this scope and every scope forked from it.
    pub fn insert<T: 'static>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Rc::new(value));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<T: 'static>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    /// The closest provided value of type `T`.
    pub fn get<T: 'static>(&self) -> Option<Rc<T>> {
        let value = Rc::clone(self.values.get(&TypeId::of::<T>())?);
        value.downcast::<T>().ok()
    }

    /// The innermost active router.
    pub fn router(&self) -> Option<&RouterHandle> {
        self.router.as_ref()
    }

    /// Fork with `router` as the innermost router.
    pub(crate) fn with_router(&self, router: RouterHandle) -> Self {
        Self {
            values: self.values.clone(),
            router: Some(router),
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("values", &self.values.len())
            .field("router", &self.router)
            .finish()
    }
}

// ============================================================================
// RouterHandle
// ============================================================================

/// Navigation access to an active router.
///
/// Handles are cheap to clone. Navigating through a handle moves the shared
/// history; the router itself resolves the committed path on its next
/// `sync()`.
#[derive(Clone)]
pub struct RouterHandle {
    history: SharedHistory,
    registry: SharedRegistry,
    namespace: String,
}

impl RouterHandle {
    pub(crate) fn new(history: SharedHistory, registry: SharedRegistry, namespace: String) -> Self {
        Self {
            history,
            registry,
            namespace,
        }
    }

    /// Navigate to `path`.
    ///
    /// Fails with [`RouterError::ReentrantNavigation`] when called while the
    /// history is dispatching a change, e.g. from a change listener.
    pub fn set_path(&self, path: &str, replace: bool) -> RouterResult<Transition> {
        let mut history =
            self.history
                .try_borrow_mut()
                .map_err(|_| RouterError::ReentrantNavigation {
                    path: path.to_string(),
                })?;
        Ok(history.set_path(path, replace))
    }

    pub fn back(&self) -> RouterResult<()> {
        self.with_history("go back", |history| history.back())
    }

    pub fn forward(&self) -> RouterResult<()> {
        self.with_history("go forward", |history| history.forward())
    }

    /// Address a link to `to` should carry.
    pub fn link_href(&self, to: &str) -> String {
        if self.use_hash_urls() {
            format!("#{}", to)
        } else {
            to.to_string()
        }
    }

    /// Whether the shared history uses hash URLs. Assumed while dispatching.
    pub fn use_hash_urls(&self) -> bool {
        self.history
            .try_borrow()
            .map(|history| history.use_hash_urls())
            .unwrap_or(true)
    }

    /// Last committed path without the query string.
    pub fn current_path(&self) -> Option<String> {
        self.history
            .try_borrow()
            .ok()
            .map(|history| history.path().to_string())
    }

    /// Namespace the router resolves in.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub(crate) fn history(&self) -> &SharedHistory {
        &self.history
    }

    pub(crate) fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    fn with_history(
        &self,
        action: &'static str,
        f: impl FnOnce(&mut crate::synchronizer::HistorySynchronizer),
    ) -> RouterResult<()> {
        let mut history = self
            .history
            .try_borrow_mut()
            .map_err(|_| RouterError::ReentrantAccess { action })?;
        f(&mut history);
        Ok(())
    }
}

impl fmt::Debug for RouterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterHandle")
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistory;
    use crate::registry::RouteRegistry;
    use crate::synchronizer::HistorySynchronizer;

    fn handle(use_hash_urls: bool) -> RouterHandle {
        let history = HistorySynchronizer::new(MemoryHistory::new("/"), use_hash_urls).into_shared();
        RouterHandle::new(history, RouteRegistry::new().into_shared(), String::new())
    }

    #[test]
    fn test_scope_values() {
        let mut scope = Scope::new();
        scope.insert(42_u32);
        scope.insert("label");

        assert_eq!(scope.get::<u32>().as_deref(), Some(&42));
        assert_eq!(scope.get::<&str>().as_deref(), Some(&"label"));
        assert!(scope.get::<String>().is_none());
    }

    #[test]
    fn test_forked_scope_inherits_values() {
        let parent = Scope::new().with(7_i64);
        let child = parent.with_router(handle(true));

        assert_eq!(child.get::<i64>().as_deref(), Some(&7));
        assert!(child.router().is_some());
        assert!(parent.router().is_none());
    }

    #[test]
    fn test_link_href() {
        assert_eq!(handle(true).link_href("RouteB"), "#RouteB");
        assert_eq!(handle(false).link_href("/RouteB"), "/RouteB");
    }

    #[test]
    fn test_set_path_through_handle() {
        let handle = handle(true);
        handle.history().borrow_mut().init();

        let transition = handle.set_path("RouteB", false).unwrap();

        assert_eq!(
            transition,
            Transition::Committed {
                path: "RouteB".to_string()
            }
        );
        assert_eq!(handle.current_path().as_deref(), Some("RouteB"));
    }

    #[test]
    fn test_reentrant_navigation_fails() {
        let handle = handle(true);
        let _dispatching = handle.history().borrow_mut();

        assert_eq!(
            handle.set_path("RouteB", false),
            Err(RouterError::ReentrantNavigation {
                path: "RouteB".to_string()
            })
        );
        assert_eq!(
            handle.back(),
            Err(RouterError::ReentrantAccess { action: "go back" })
        );
        assert_eq!(
            handle.forward(),
            Err(RouterError::ReentrantAccess {
                action: "go forward"
            })
        );
        assert!(handle.use_hash_urls());
    }
}
