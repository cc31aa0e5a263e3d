//! Link affordance
//!
//! A [`RouterLink`] is bound to the innermost router of the scope it was
//! created in. The rendering layer shows [`href`](RouterLink::href) and calls
//! [`follow`](RouterLink::follow) when the link is activated.

use crate::context::{RouterHandle, Scope};
use crate::error::{RouterError, RouterResult};
use crate::synchronizer::Transition;
use crate::trace_log;

/// Link to a path of the closest active router.
///
/// # Example
///
/// ```
/// use history_router::{RouterError, RouterLink, Scope};
///
/// // Links only work inside a router.
/// let result = RouterLink::new(&Scope::new(), "RouteB");
/// assert_eq!(result.err(), Some(RouterError::NoActiveRouter));
/// ```
#[derive(Debug, Clone)]
pub struct RouterLink {
    to: String,
    router: RouterHandle,
}

impl RouterLink {
    /// Bind a link to `to` to the router of `scope`.
    pub fn new(scope: &Scope, to: impl Into<String>) -> RouterResult<Self> {
        let router = scope.router().ok_or(RouterError::NoActiveRouter)?.clone();
        Ok(Self {
            to: to.into(),
            router,
        })
    }

    /// Target path.
    pub fn to(&self) -> &str {
        &self.to
    }

    /// Address to display, `#`-prefixed in hash mode.
    pub fn href(&self) -> String {
        self.router.link_href(&self.to)
    }

    /// Navigate to the target. The router resolves on its next `sync()`.
    pub fn follow(&self) -> RouterResult<Transition> {
        trace_log!("Following link to '{}'", self.to);
        self.router.set_path(&self.to, false)
    }
}
