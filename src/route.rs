//! Route definitions and live route instances
//!
//! A route type implements [`Route`] and is registered against one or more
//! path expressions. When the router commits a path it asks the matching
//! [`PathMatcher`] for a [`RouteInstance`], which owns the user route object
//! together with its observable parameters.

use crate::context::Scope;
use crate::events::SubscriptionId;
use crate::matcher::PathMatcher;
use crate::params::{QueryParams, RouteFields};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Route trait
// ============================================================================

/// Access to a route as [`Any`] for downcasting.
///
/// Implemented for every `'static` type; there is no need to implement it by hand.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A page of the application.
///
/// # Example
///
/// ```
/// use history_router::{Route, RouteContext};
///
/// struct UserPage {
///     id: String,
/// }
///
/// impl Route for UserPage {
///     fn create(cx: &RouteContext<'_>) -> Self {
///         UserPage {
///             id: cx.param("id").unwrap_or_default().to_string(),
///         }
///     }
///
///     fn title(&self, _cx: &RouteContext<'_>) -> Option<String> {
///         Some(format!("User {}", self.id))
///     }
/// }
/// ```
pub trait Route: AsAny {
    /// Build the route for a freshly committed path.
    fn create(cx: &RouteContext<'_>) -> Self
    where
        Self: Sized;

    /// Called once after the route became the router's current route.
    fn enter(&mut self, _cx: &RouteContext<'_>) {}

    /// Called once before the route is replaced. Not called when the router
    /// itself is dropped.
    fn leave(&mut self, _cx: &RouteContext<'_>) {}

    /// Human readable title of the page.
    fn title(&self, _cx: &RouteContext<'_>) -> Option<String> {
        None
    }
}

type RouteFactory = dyn Fn(&RouteContext<'_>) -> Box<dyn Route> + Send + Sync;

/// The route type a pattern creates: a display name and a factory.
#[derive(Clone)]
pub struct RouteTarget {
    type_name: &'static str,
    factory: Arc<RouteFactory>,
}

impl RouteTarget {
    /// Target for a [`Route`] type.
    pub fn of<R: Route>() -> Self {
        let full = std::any::type_name::<R>();
        Self {
            type_name: full.rsplit("::").next().unwrap_or(full),
            factory: Arc::new(|cx| Box::new(R::create(cx))),
        }
    }

    /// Target built by a custom factory.
    pub fn from_factory<F>(type_name: &'static str, factory: F) -> Self
    where
        F: Fn(&RouteContext<'_>) -> Box<dyn Route> + Send + Sync + 'static,
    {
        Self {
            type_name,
            factory: Arc::new(factory),
        }
    }

    /// Short name of the route type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn build(&self, cx: &RouteContext<'_>) -> Box<dyn Route> {
        (self.factory)(cx)
    }
}

impl fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RouteTarget").field(&self.type_name).finish()
    }
}

// ============================================================================
// Route context
// ============================================================================

/// Router state visible to route hooks.
#[derive(Debug, Clone, Copy)]
pub struct RouterSnapshot<'a> {
    pub current_path: &'a str,
    pub query_params: &'a QueryParams,
    pub history_id: Option<&'a str>,
    pub scope: &'a Scope,
}

/// What a route sees of its router while one of its hooks runs.
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    router: RouterSnapshot<'a>,
    params: &'a RouteFields,
}

impl<'a> RouteContext<'a> {
    pub(crate) fn new(router: RouterSnapshot<'a>, params: &'a RouteFields) -> Self {
        Self { router, params }
    }

    /// Path the router committed, without the query string.
    pub fn current_path(&self) -> &'a str {
        self.router.current_path
    }

    pub fn query_params(&self) -> &'a QueryParams {
        self.router.query_params
    }

    /// Identifier of the current history entry.
    pub fn history_id(&self) -> Option<&'a str> {
        self.router.history_id
    }

    /// Context values of the router's render scope.
    pub fn scope(&self) -> &'a Scope {
        self.router.scope
    }

    pub fn params(&self) -> &'a RouteFields {
        self.params
    }

    /// Shorthand for `params().get(name)`.
    pub fn param(&self, name: &str) -> Option<&'a str> {
        self.params.get(name)
    }
}

// ============================================================================
// Route instance
// ============================================================================

/// A live route owned by a router.
pub struct RouteInstance {
    matcher: Arc<PathMatcher>,
    fields: RouteFields,
    handler: Box<dyn Route>,
}

impl RouteInstance {
    pub(crate) fn create(
        matcher: Arc<PathMatcher>,
        fields: RouteFields,
        router: RouterSnapshot<'_>,
    ) -> Self {
        let handler = matcher
            .target()
            .build(&RouteContext::new(router, &fields));
        Self {
            matcher,
            fields,
            handler,
        }
    }

    /// The matcher that created this instance.
    pub fn matcher(&self) -> &Arc<PathMatcher> {
        &self.matcher
    }

    /// Pattern of the matcher that created this instance.
    pub fn pattern(&self) -> &str {
        self.matcher.pattern()
    }

    pub fn type_name(&self) -> &'static str {
        self.matcher.target().type_name()
    }

    pub fn params(&self) -> &RouteFields {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut RouteFields {
        &mut self.fields
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.fields.get(name)
    }

    /// Watch a parameter; the watcher fires when an in-place update changes it.
    pub fn watch_param<F>(&mut self, name: &str, watcher: F) -> Option<SubscriptionId>
    where
        F: FnMut(&Option<String>) + 'static,
    {
        self.fields.watch(name, watcher)
    }

    pub fn unwatch_param(&mut self, name: &str, id: SubscriptionId) -> bool {
        self.fields.unwatch(name, id)
    }

    /// Borrow the user route as `T`.
    pub fn downcast_ref<T: Route>(&self) -> Option<&T> {
        AsAny::as_any(&*self.handler).downcast_ref()
    }

    /// Mutably borrow the user route as `T`.
    pub fn downcast_mut<T: Route>(&mut self) -> Option<&mut T> {
        AsAny::as_any_mut(&mut *self.handler).downcast_mut()
    }

    pub fn title(&self, router: RouterSnapshot<'_>) -> Option<String> {
        self.handler.title(&RouteContext::new(router, &self.fields))
    }

    pub(crate) fn enter(&mut self, router: RouterSnapshot<'_>) {
        self.handler.enter(&RouteContext::new(router, &self.fields));
    }

    pub(crate) fn leave(&mut self, router: RouterSnapshot<'_>) {
        self.handler.leave(&RouteContext::new(router, &self.fields));
    }

    /// Detach every parameter watcher, then drop the route.
    pub(crate) fn dispose(mut self) {
        self.fields.clear_watchers();
    }
}

impl fmt::Debug for RouteInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteInstance")
            .field("pattern", &self.pattern())
            .field("type", &self.type_name())
            .field("params", &self.fields)
            .finish()
    }
}
