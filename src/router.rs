//! Router orchestration
//!
//! A [`Router`] owns the current [`RouteInstance`] of one namespace and keeps
//! it in step with the shared history:
//!
//! 1. The synchronizer commits a path and notifies every router through its
//!    `commit` stream
//! 2. [`Router::sync`] resolves the committed path against the registry
//! 3. The current route is updated in place when the same matcher still
//!    applies; otherwise it is left, disposed and replaced
//! 4. `update` listeners are notified
//!
//! The outermost router owns the synchronizer. Routers mounted inside it with
//! [`RouterBuilder::mount_nested`] share that synchronizer (and therefore its
//! hash mode) but resolve in their own namespace.

use crate::change::RouteChangeEvent;
use crate::context::{RouterHandle, Scope};
use crate::diagnostics::{report, Diagnostic};
use crate::error::{RouterError, RouterResult};
use crate::events::{Emitter, SubscriptionId};
use crate::history::{HistoryPlatform, HistoryState};
use crate::params::QueryParams;
use crate::registry::{RouteRegistry, SharedRegistry};
use crate::route::{RouteInstance, RouterSnapshot};
use crate::synchronizer::{HistorySynchronizer, SharedHistory, Transition};
use crate::{debug_log, info_log, trace_log};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

// ============================================================================
// Configuration
// ============================================================================

/// Router configuration
///
/// # Example
///
/// ```
/// use history_router::RouterConfig;
///
/// let config = RouterConfig::new()
///     .namespace("pages")
///     .use_hash_urls(false)
///     .force_reload(true);
///
/// assert_eq!(config.namespace_name(), "pages");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    namespace: String,
    use_hash_urls: bool,
    force_reload: bool,
}

impl RouterConfig {
    /// Default namespace, hash URLs on, routes reused when possible.
    pub fn new() -> Self {
        Self {
            namespace: String::new(),
            use_hash_urls: true,
            force_reload: false,
        }
    }

    /// Namespace to resolve routes in.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Keep paths in the URL fragment. Ignored by nested routers.
    pub fn use_hash_urls(mut self, use_hash_urls: bool) -> Self {
        self.use_hash_urls = use_hash_urls;
        self
    }

    /// Recreate the route on every commit, even when it could be updated in place.
    pub fn force_reload(mut self, force_reload: bool) -> Self {
        self.force_reload = force_reload;
        self
    }

    pub fn namespace_name(&self) -> &str {
        &self.namespace
    }

    pub fn hash_urls(&self) -> bool {
        self.use_hash_urls
    }

    pub fn reloads(&self) -> bool {
        self.force_reload
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload of the router's `update` stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterUpdate {
    /// Path the router resolved.
    pub path: String,
    /// Whether a new route instance was created.
    pub recreated: bool,
}

type ChangeListener = Box<dyn FnMut(&mut RouteChangeEvent)>;
type UpdateListener = Box<dyn FnMut(&mut RouterUpdate)>;

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Router`].
#[derive(Default)]
pub struct RouterBuilder {
    config: RouterConfig,
    registry: Option<SharedRegistry>,
    scope: Scope,
    change_listeners: Vec<ChangeListener>,
    update_listeners: Vec<UpdateListener>,
}

impl RouterBuilder {
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config = self.config.namespace(namespace);
        self
    }

    pub fn use_hash_urls(mut self, use_hash_urls: bool) -> Self {
        self.config = self.config.use_hash_urls(use_hash_urls);
        self
    }

    pub fn force_reload(mut self, force_reload: bool) -> Self {
        self.config = self.config.force_reload(force_reload);
        self
    }

    /// Registry to resolve against. Defaults to [`RouteRegistry::global`]
    /// for outermost routers and to the parent's registry for nested ones.
    pub fn registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Context values visible to routes. Only used by outermost routers;
    /// nested routers fork their parent's scope.
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Listen for interceptable changes, starting with the initial one.
    pub fn on_change<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&mut RouteChangeEvent) + 'static,
    {
        self.change_listeners.push(Box::new(listener));
        self
    }

    /// Listen for resolutions, starting with the initial one.
    pub fn on_update<F>(mut self, mut listener: F) -> Self
    where
        F: FnMut(&RouterUpdate) + 'static,
    {
        self.update_listeners
            .push(Box::new(move |update: &mut RouterUpdate| listener(update)));
        self
    }

    /// Mount the outermost router over `platform` and resolve its initial path.
    pub fn mount(self, platform: impl HistoryPlatform + 'static) -> Router {
        let history = HistorySynchronizer::new(platform, self.config.use_hash_urls).into_shared();
        let registry = self.registry.clone().unwrap_or_else(RouteRegistry::global);
        let scope = self.scope.clone();

        let mut router = self.attach(history, registry, &scope, true);
        info_log!("Mounted router for namespace '{}'", router.config.namespace);

        router.handle.history().borrow_mut().init();
        router.sync();
        router
    }

    /// Mount a router inside the closest router of `parent`.
    ///
    /// Fails with [`RouterError::NoActiveRouter`] when `parent` has no router.
    pub fn mount_nested(self, parent: &Scope) -> RouterResult<Router> {
        let outer = parent.router().ok_or(RouterError::NoActiveRouter)?;
        let history = Rc::clone(outer.history());
        let registry = self
            .registry
            .clone()
            .unwrap_or_else(|| outer.registry().clone());

        let mut router = self.attach(history, registry, parent, false);
        debug_log!("Mounted nested router for namespace '{}'", router.config.namespace);

        router.pending.set(true);
        router.sync();
        Ok(router)
    }

    fn attach(
        self,
        history: SharedHistory,
        registry: SharedRegistry,
        parent: &Scope,
        outermost: bool,
    ) -> Router {
        let handle = RouterHandle::new(
            Rc::clone(&history),
            registry,
            self.config.namespace.clone(),
        );
        let pending = Rc::new(Cell::new(false));

        let (commit_subscription, change_subscriptions) = {
            let mut history = history.borrow_mut();
            let flag = Rc::clone(&pending);
            let commit = history.on_commit(move |_| flag.set(true));
            let changes = self
                .change_listeners
                .into_iter()
                .map(|listener| history.on_change(listener))
                .collect();
            (commit, changes)
        };

        let mut update = Emitter::new();
        for listener in self.update_listeners {
            update.subscribe(listener);
        }

        Router {
            config: self.config,
            scope: parent.with_router(handle.clone()),
            handle,
            outermost,
            current_route: None,
            pending,
            commit_subscription,
            change_subscriptions,
            update,
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Keeps the current route of one namespace in step with history.
pub struct Router {
    config: RouterConfig,
    handle: RouterHandle,
    scope: Scope,
    outermost: bool,
    current_route: Option<RouteInstance>,
    pending: Rc<Cell<bool>>,
    commit_subscription: SubscriptionId,
    change_subscriptions: Vec<SubscriptionId>,
    update: Emitter<RouterUpdate>,
}

/// Router state copied out of the synchronizer for one resolution.
struct Observed {
    path: String,
    query_params: QueryParams,
    history_id: Option<String>,
}

impl Observed {
    fn snapshot<'a>(&'a self, scope: &'a Scope) -> RouterSnapshot<'a> {
        RouterSnapshot {
            current_path: &self.path,
            query_params: &self.query_params,
            history_id: self.history_id.as_deref(),
            scope,
        }
    }
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Mount an outermost router over `platform` with the global registry.
    pub fn new(platform: impl HistoryPlatform + 'static, config: RouterConfig) -> Self {
        Self::builder().config(config).mount(platform)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Navigate to `path` and resolve the result.
    pub fn set_path(&mut self, path: &str, replace: bool) -> RouterResult<Transition> {
        let transition = self.handle.set_path(path, replace)?;
        self.sync();
        Ok(transition)
    }

    /// Go back. Observed on the next [`poll`](Self::poll).
    pub fn back(&mut self) -> RouterResult<()> {
        self.handle.back()
    }

    /// Go forward. Observed on the next [`poll`](Self::poll).
    pub fn forward(&mut self) -> RouterResult<()> {
        self.handle.forward()
    }

    /// Deliver pending platform notifications, resolving after each one.
    pub fn poll(&mut self) -> Vec<Transition> {
        let mut transitions = Vec::new();
        loop {
            let next = match self.handle.history().try_borrow_mut() {
                Ok(mut history) => history.poll_event(),
                Err(_) => None,
            };
            let Some(transition) = next else {
                break;
            };
            transitions.push(transition);
            self.sync();
        }
        transitions
    }

    /// Resolve every commit observed since the last call.
    pub fn sync(&mut self) {
        while self.pending.get() {
            let observed = match self.handle.history().try_borrow() {
                Ok(history) => Observed {
                    path: history.path().to_string(),
                    query_params: history.query_params().clone(),
                    history_id: history.history_id(),
                },
                Err(_) => return,
            };
            self.pending.set(false);
            self.resolve(observed);
        }
    }

    fn resolve(&mut self, observed: Observed) {
        let namespace = self.config.namespace.as_str();
        let resolved = self.handle.registry().read().resolve(namespace, &observed.path);
        let Some(matcher) = resolved else {
            report(Diagnostic::NoMatchingRoute {
                namespace: namespace.to_string(),
                path: observed.path.clone(),
            });
            return;
        };

        let snapshot = observed.snapshot(&self.scope);
        let updated = !self.config.force_reload
            && self
                .current_route
                .as_mut()
                .is_some_and(|route| matcher.update_in_place(route, &observed.path));

        if !updated {
            if let Some(mut previous) = self.current_route.take() {
                trace_log!("Leaving route {}", previous.type_name());
                previous.leave(snapshot);
                previous.dispose();
            }
            let mut route = matcher.create_route(&observed.path, snapshot);
            route.enter(snapshot);
            debug_log!(
                "Route {} entered for '{}' in namespace '{}'",
                route.type_name(),
                observed.path,
                namespace
            );
            self.current_route = Some(route);
        }

        self.update.emit(&mut RouterUpdate {
            path: observed.path,
            recreated: !updated,
        });
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Data attached to the current history entry.
    pub fn state(&self) -> Option<HistoryState> {
        self.handle.history().try_borrow().ok()?.state().cloned()
    }

    /// Attach `data` to the current history entry.
    pub fn set_state(&mut self, data: HistoryState) -> RouterResult<()> {
        let mut history = self
            .handle
            .history()
            .try_borrow_mut()
            .map_err(|_| RouterError::ReentrantAccess {
                action: "set history state",
            })?;
        history.set_state(data);
        Ok(())
    }

    /// Last committed path without the query string.
    pub fn current_path(&self) -> String {
        self.handle.current_path().unwrap_or_default()
    }

    /// Query parameters of the last committed path.
    pub fn query_params(&self) -> QueryParams {
        self.handle
            .history()
            .try_borrow()
            .map(|history| history.query_params().clone())
            .unwrap_or_default()
    }

    pub fn current_route(&self) -> Option<&RouteInstance> {
        self.current_route.as_ref()
    }

    pub fn current_route_mut(&mut self) -> Option<&mut RouteInstance> {
        self.current_route.as_mut()
    }

    /// Title reported by the current route.
    pub fn current_title(&self) -> Option<String> {
        let route = self.current_route.as_ref()?;
        let observed = {
            let history = self.handle.history().try_borrow().ok()?;
            Observed {
                path: history.path().to_string(),
                query_params: history.query_params().clone(),
                history_id: history.history_id(),
            }
        };
        route.title(observed.snapshot(&self.scope))
    }

    /// Identifier of the current history entry.
    pub fn history_id(&self) -> Option<String> {
        self.handle.history().try_borrow().ok()?.history_id()
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    /// Listen for interceptable changes on the shared history.
    pub fn on_change<F>(&mut self, listener: F) -> RouterResult<SubscriptionId>
    where
        F: FnMut(&mut RouteChangeEvent) + 'static,
    {
        let mut history = self
            .handle
            .history()
            .try_borrow_mut()
            .map_err(|_| RouterError::ReentrantAccess {
                action: "add a change listener",
            })?;
        let id = history.on_change(listener);
        self.change_subscriptions.push(id);
        Ok(id)
    }

    pub fn off_change(&mut self, id: SubscriptionId) -> bool {
        let Some(position) = self.change_subscriptions.iter().position(|known| *known == id)
        else {
            return false;
        };
        match self.handle.history().try_borrow_mut() {
            Ok(mut history) => {
                self.change_subscriptions.remove(position);
                history.off_change(id)
            }
            Err(_) => false,
        }
    }

    /// Listen for resolutions.
    pub fn on_update<F>(&mut self, mut listener: F) -> SubscriptionId
    where
        F: FnMut(&RouterUpdate) + 'static,
    {
        self.update
            .subscribe(move |update: &mut RouterUpdate| listener(update))
    }

    pub fn off_update(&mut self, id: SubscriptionId) -> bool {
        self.update.unsubscribe(id)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Address a link to `to` should carry.
    pub fn link_href(&self, to: &str) -> String {
        self.handle.link_href(to)
    }

    /// Scope for views rendered inside this router.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn handle(&self) -> &RouterHandle {
        &self.handle
    }

    pub fn use_hash_urls(&self) -> bool {
        self.handle.use_hash_urls()
    }

    /// Switch hash URLs on or off. Nested routers follow their outermost
    /// router and ignore this.
    pub fn set_use_hash_urls(&mut self, use_hash_urls: bool) {
        if !self.outermost {
            debug_log!(
                "Ignoring hash URL change on nested router '{}'",
                self.config.namespace
            );
            return;
        }
        if let Ok(mut history) = self.handle.history().try_borrow_mut() {
            history.set_use_hash_urls(use_hash_urls);
            self.config.use_hash_urls = history.use_hash_urls();
        }
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn is_outermost(&self) -> bool {
        self.outermost
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        if let Ok(mut history) = self.handle.history().try_borrow_mut() {
            history.off_commit(self.commit_subscription);
            for id in self.change_subscriptions.drain(..) {
                history.off_change(id);
            }
        }
        if let Some(route) = self.current_route.take() {
            route.dispose();
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("outermost", &self.outermost)
            .field("current_route", &self.current_route)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistory;
    use crate::route::{Route, RouteContext};
    use std::cell::RefCell;

    struct Home;
    struct User;

    impl Route for Home {
        fn create(_cx: &RouteContext<'_>) -> Self {
            Home
        }
    }

    impl Route for User {
        fn create(_cx: &RouteContext<'_>) -> Self {
            User
        }

        fn title(&self, cx: &RouteContext<'_>) -> Option<String> {
            cx.param("id").map(|id| format!("User {}", id))
        }
    }

    fn registry() -> SharedRegistry {
        let mut registry = RouteRegistry::new();
        registry.register::<Home>("", "$default").unwrap();
        registry.register::<User>("", "users/:id").unwrap();
        registry.into_shared()
    }

    #[test]
    fn test_config_builder() {
        let config = RouterConfig::new().namespace("pages").force_reload(true);
        assert_eq!(config.namespace_name(), "pages");
        assert!(config.hash_urls());
        assert!(config.reloads());
    }

    #[test]
    fn test_mount_resolves_initial_path() {
        let router = Router::builder()
            .registry(registry())
            .mount(MemoryHistory::new("/#users/7"));

        let route = router.current_route().unwrap();
        assert_eq!(route.type_name(), "User");
        assert_eq!(route.param("id"), Some("7"));
        assert_eq!(router.current_title().as_deref(), Some("User 7"));
        assert!(router.is_outermost());
    }

    #[test]
    fn test_update_events() {
        let updates = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&updates);
        let mut router = Router::builder()
            .registry(registry())
            .on_update(move |update| sink.borrow_mut().push(update.clone()))
            .mount(MemoryHistory::new("/"));

        router.set_path("users/1", false).unwrap();
        router.set_path("users/2", false).unwrap();

        let updates = updates.borrow();
        let recreated: Vec<bool> = updates.iter().map(|update| update.recreated).collect();
        assert_eq!(recreated, vec![true, true, false]);
        assert_eq!(updates[2].path, "users/2");
    }

    #[test]
    fn test_change_listener_unsubscribes() {
        let seen = Rc::new(Cell::new(0));
        let mut router = Router::builder()
            .registry(registry())
            .mount(MemoryHistory::new("/"));
        let counter = Rc::clone(&seen);
        let id = router
            .on_change(move |_| counter.set(counter.get() + 1))
            .unwrap();

        router.set_path("a", false).unwrap();
        assert!(router.off_change(id));
        assert!(!router.off_change(id));
        router.set_path("b", false).unwrap();

        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_state_access_during_dispatch_fails() {
        let mut router = Router::builder()
            .registry(registry())
            .mount(MemoryHistory::new("/"));
        let history = Rc::clone(router.handle().history());
        let _dispatching = history.borrow_mut();

        assert_eq!(
            router.set_state(HistoryState::new().with("a", "b")),
            Err(RouterError::ReentrantAccess {
                action: "set history state"
            })
        );
        assert_eq!(
            router.on_change(|_| {}),
            Err(RouterError::ReentrantAccess {
                action: "add a change listener"
            })
        );
    }

    #[test]
    fn test_nested_requires_router() {
        let result = Router::builder().mount_nested(&Scope::new());
        assert_eq!(result.err(), Some(RouterError::NoActiveRouter));
    }

    #[test]
    fn test_nested_router_ignores_hash_setting() {
        let outer = Router::builder()
            .registry(registry())
            .mount(MemoryHistory::new("/"));
        let mut nested = Router::builder().mount_nested(outer.scope()).unwrap();

        nested.set_use_hash_urls(false);
        assert!(nested.use_hash_urls());
        assert!(!nested.is_outermost());
    }

    #[test]
    fn test_drop_unsubscribes_from_shared_history() {
        let outer = Router::builder()
            .registry(registry())
            .on_change(|_| {})
            .mount(MemoryHistory::new("/"));
        let history = Rc::clone(outer.handle().history());
        let nested = Router::builder()
            .on_change(|_| {})
            .mount_nested(outer.scope())
            .unwrap();

        let listeners = |history: &SharedHistory| format!("{:?}", history.borrow());
        assert!(listeners(&history).contains("change: Emitter { listeners: 2 }"));
        drop(nested);
        assert!(listeners(&history).contains("change: Emitter { listeners: 1 }"));
        assert!(listeners(&history).contains("commit: Emitter { listeners: 1 }"));
    }
}
