//! GPUI integration
//!
//! Installs one outermost [`Router`] as a GPUI global so views can navigate
//! through the [`Navigator`] facade. Desktop apps have no native session
//! history, so the router runs over a [`MemoryHistory`].

use crate::history::MemoryHistory;
use crate::registry::RouteRegistry;
use crate::router::{Router, RouterConfig};
use crate::warn_log;
use gpui::{App, BorrowAppContext, Global};

// ============================================================================
// GlobalRouter
// ============================================================================

/// The app-wide router.
pub struct GlobalRouter {
    router: Router,
    history: MemoryHistory,
}

impl GlobalRouter {
    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    /// The in-memory history the router runs over.
    pub fn history(&self) -> &MemoryHistory {
        &self.history
    }

    fn navigate(&mut self, path: &str, replace: bool) {
        if let Err(error) = self.router.set_path(path, replace) {
            warn_log!("Navigation to '{}' failed: {}", path, error);
        }
    }

    fn step(&mut self, forward: bool) {
        let moved = if forward {
            self.router.forward()
        } else {
            self.router.back()
        };
        match moved {
            Ok(()) => {
                self.router.poll();
            }
            Err(error) => {
                warn_log!("History navigation failed: {}", error);
            }
        }
    }
}

impl Global for GlobalRouter {}

/// Initialize the global router
///
/// # Example
///
/// ```ignore
/// use history_router::{init_router, RouterConfig};
///
/// fn main() {
///     Application::new().run(|cx| {
///         init_router(cx, RouterConfig::new(), |registry| {
///             registry.register::<HomePage>("", "$default").unwrap();
///             registry.register::<UserPage>("", "users/:id").unwrap();
///         });
///     });
/// }
/// ```
pub fn init_router<F>(cx: &mut App, config: RouterConfig, configure: F)
where
    F: FnOnce(&mut RouteRegistry),
{
    let mut registry = RouteRegistry::new();
    configure(&mut registry);

    let history = MemoryHistory::new("/");
    let router = Router::builder()
        .config(config)
        .registry(registry.into_shared())
        .mount(history.clone());
    cx.set_global(GlobalRouter { router, history });
}

// ============================================================================
// Navigator
// ============================================================================

/// Navigation through the global router.
///
/// ```ignore
/// use history_router::Navigator;
///
/// Navigator::set_path(cx, "users/42");
/// Navigator::back(cx);
/// ```
pub struct Navigator;

impl Navigator {
    /// Navigate to a new path
    pub fn set_path(cx: &mut impl BorrowAppContext, path: &str) {
        cx.update_global::<GlobalRouter, _>(|global, _| global.navigate(path, false));
    }

    /// Replace current path without adding to history
    pub fn replace(cx: &mut impl BorrowAppContext, path: &str) {
        cx.update_global::<GlobalRouter, _>(|global, _| global.navigate(path, true));
    }

    /// Go back in history
    pub fn back(cx: &mut impl BorrowAppContext) {
        cx.update_global::<GlobalRouter, _>(|global, _| global.step(false));
    }

    /// Go forward in history
    pub fn forward(cx: &mut impl BorrowAppContext) {
        cx.update_global::<GlobalRouter, _>(|global, _| global.step(true));
    }

    /// Get current path
    ///
    /// Works with `Context<V>` since it derefs to App
    pub fn current_path(cx: &App) -> String {
        cx.global::<GlobalRouter>().router.current_path()
    }

    /// Identifier of the current history entry
    pub fn history_id(cx: &App) -> Option<String> {
        cx.global::<GlobalRouter>().router.history_id()
    }
}
