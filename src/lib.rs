//! # History Router
//!
//! A navigation engine that keeps an application's current route in step with
//! a path stored in session history:
//!
//! - **History synchronization** - native back/forward and programmatic
//!   navigation become one linear stream of path changes
//! - **Interception** - listeners can abort or redirect any change before it
//!   commits, including undoing a back/forward step
//! - **Namespaced resolution** - paths resolve against per-namespace route
//!   tables with named, optional and wildcard segments
//! - **Route reuse** - a route still matched by the same pattern is updated
//!   in place through observable parameters instead of being recreated
//!
//! # Quick Start
//!
//! ```
//! use history_router::*;
//!
//! struct Home;
//! impl Route for Home {
//!     fn create(_cx: &RouteContext<'_>) -> Self {
//!         Home
//!     }
//! }
//!
//! struct User;
//! impl Route for User {
//!     fn create(_cx: &RouteContext<'_>) -> Self {
//!         User
//!     }
//!
//!     fn title(&self, cx: &RouteContext<'_>) -> Option<String> {
//!         cx.param("id").map(|id| format!("User {}", id))
//!     }
//! }
//!
//! let mut registry = RouteRegistry::new();
//! registry.register::<Home>("", "$default").unwrap();
//! registry.register::<User>("", "users/:id").unwrap();
//!
//! let mut router = Router::builder()
//!     .registry(registry.into_shared())
//!     .on_change(|change| {
//!         if change.new_path() == "users/admin" {
//!             change.abort();
//!         }
//!     })
//!     .mount(MemoryHistory::new("/"));
//!
//! router.set_path("users/42", false).unwrap();
//! assert_eq!(router.current_title().as_deref(), Some("User 42"));
//!
//! router.set_path("users/admin", false).unwrap();
//! assert_eq!(router.current_path(), "users/42");
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually exclusive with `log`)
//! - `cache` (default) - LRU cache for route resolution
//! - `gpui` - App-global router and `Navigator` facade for GPUI applications

#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Ambient infrastructure
pub mod diagnostics;
pub mod error;
pub mod events;

// Cache (optional)
#[cfg(feature = "cache")]
pub mod cache;

// Route resolution
pub mod matcher;
pub mod params;
pub mod registry;
pub mod route;

// History and interception
pub mod change;
pub mod history;
pub mod synchronizer;

// Routers and the render scope
pub mod context;
pub mod router;
pub mod widgets;

// GPUI integration (optional)
#[cfg(feature = "gpui")]
pub mod gpui_support;

// Re-export main types for convenient access
#[cfg(feature = "cache")]
pub use cache::{CacheStats, RouteCache};
pub use change::{ChangeDecision, RouteChangeEvent};
pub use context::{RouterHandle, Scope};
pub use diagnostics::Diagnostic;
pub use error::{PatternError, RouterError, RouterResult};
pub use events::{Emitter, ObservableField, SubscriptionId};
#[cfg(feature = "gpui")]
pub use gpui_support::{init_router, GlobalRouter, Navigator};
pub use history::{
    EntryPayload, HistoryPlatform, HistoryState, Location, MemoryHistory, PopStateEvent,
};
pub use matcher::{ParamDescriptor, PathMatcher, DEFAULT_PATTERN};
pub use params::{QueryParams, RouteFields};
pub use registry::{Resolution, RouteRegistry, SharedRegistry};
pub use route::{AsAny, Route, RouteContext, RouteInstance, RouteTarget, RouterSnapshot};
pub use router::{Router, RouterBuilder, RouterConfig, RouterUpdate};
pub use synchronizer::{CommittedChange, HistorySynchronizer, SharedHistory, Transition};
pub use widgets::RouterLink;

/// Direction of a step through history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDirection {
    /// Towards newer entries
    Forward,
    /// Towards older entries
    Back,
}

impl NavigationDirection {
    /// The step that undoes this one.
    #[must_use]
    pub fn reverse(self) -> Self {
        match self {
            Self::Forward => Self::Back,
            Self::Back => Self::Forward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_direction_reverse() {
        assert_eq!(NavigationDirection::Back.reverse(), NavigationDirection::Forward);
        assert_eq!(NavigationDirection::Forward.reverse().reverse(), NavigationDirection::Forward);
    }
}
