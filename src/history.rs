//! Platform session history
//!
//! The synchronizer talks to the host's session history through
//! [`HistoryPlatform`]. [`MemoryHistory`] is the in-memory implementation used
//! by tests and by hosts without a native history (desktop, server shims). It
//! behaves like a browser tab:
//!
//! - Pushing truncates any forward entries
//! - `back`/`forward` move through entries and queue a pop notification
//! - Typing a URL (`navigate`) pushes a state-less entry and queues a pop
//! - Pop notifications are delivered when polled, never synchronously

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

// ============================================================================
// Entry data
// ============================================================================

/// User data stored with a history entry
///
/// Can store arbitrary data for history restoration
/// (e.g., scroll position, form data, etc.)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryState {
    /// Key-value pairs for state data
    pub data: HashMap<String, String>,
}

impl HistoryState {
    /// Create new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}

/// What the router stores in each platform history entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPayload {
    /// Page identifier, `"<session tag>_<page id>"`.
    pub id: Option<String>,
    /// Application data attached with `set_state`.
    pub user: Option<HistoryState>,
}

/// Notification that the user moved through history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopStateEvent {
    /// Payload of the entry that became current.
    pub state: Option<EntryPayload>,
}

/// Current address, split like a browser location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Path starting with `/`.
    pub pathname: String,
    /// Query string including the leading `?`, or empty.
    pub search: String,
    /// Fragment including the leading `#`, or empty.
    pub hash: String,
}

impl Location {
    /// Parse an absolute path such as `/a/b?x=1#frag`.
    pub fn parse(url: &str) -> Self {
        let (rest, hash) = match url.find('#') {
            Some(index) => (&url[..index], &url[index..]),
            None => (url, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(index) => (&rest[..index], &rest[index..]),
            None => (rest, ""),
        };
        let pathname = if pathname.starts_with('/') {
            pathname.to_string()
        } else {
            format!("/{}", pathname)
        };
        Self {
            pathname,
            search: search.to_string(),
            hash: hash.to_string(),
        }
    }

    /// Resolve `url` against this location, like following a link.
    pub fn resolve(&self, url: &str) -> Self {
        if url.starts_with('#') {
            return Self {
                hash: url.to_string(),
                ..self.clone()
            };
        }
        if url.starts_with('?') {
            return Self::parse(&format!("{}{}", self.pathname, url));
        }
        if url.starts_with('/') {
            return Self::parse(url);
        }
        let directory = match self.pathname.rfind('/') {
            Some(index) => &self.pathname[..=index],
            None => "/",
        };
        Self::parse(&format!("{}{}", directory, url))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.pathname, self.search, self.hash)
    }
}

// ============================================================================
// Platform contract
// ============================================================================

/// Session history of the host platform.
pub trait HistoryPlatform {
    /// Current address.
    fn location(&self) -> Location;

    /// Payload of the current entry.
    fn state(&self) -> Option<EntryPayload>;

    /// Add an entry after the current one, dropping any forward entries.
    fn push_state(&mut self, payload: EntryPayload, url: &str);

    /// Rewrite the current entry's payload, and its address when `url` is given.
    fn replace_state(&mut self, payload: EntryPayload, url: Option<&str>);

    /// Move one entry back. The notification arrives through `poll_event`.
    fn back(&mut self);

    /// Move one entry forward. The notification arrives through `poll_event`.
    fn forward(&mut self);

    /// Next pending "user navigated" notification.
    fn poll_event(&mut self) -> Option<PopStateEvent>;

    /// Whether paths can live outside the fragment.
    fn supports_history_api(&self) -> bool {
        true
    }

    /// Whether entry payloads survive (false for unhosted documents).
    fn can_persist_state(&self) -> bool {
        true
    }
}

// ============================================================================
// In-memory history
// ============================================================================

#[derive(Debug, Clone)]
struct Entry {
    location: Location,
    state: Option<EntryPayload>,
}

#[derive(Debug)]
struct Inner {
    entries: Vec<Entry>,
    index: usize,
    pending: VecDeque<PopStateEvent>,
    history_api: bool,
    persist: bool,
}

impl Inner {
    fn current(&self) -> Option<&Entry> {
        self.entries.get(self.index)
    }

    fn current_mut(&mut self) -> Option<&mut Entry> {
        self.entries.get_mut(self.index)
    }

    fn current_location(&self) -> Location {
        self.current()
            .map(|entry| entry.location.clone())
            .unwrap_or_default()
    }

    fn push(&mut self, entry: Entry) {
        self.entries.truncate(self.index + 1);
        self.entries.push(entry);
        self.index = self.entries.len() - 1;
    }

    fn queue_current(&mut self) {
        let state = self.current().and_then(|entry| entry.state.clone());
        self.pending.push_back(PopStateEvent { state });
    }
}

/// In-memory session history.
///
/// Clones share the same history, so a test can keep a handle to drive
/// "user" navigation while the router owns another.
///
/// # Example
///
/// ```
/// use history_router::{HistoryPlatform, MemoryHistory};
///
/// let mut history = MemoryHistory::new("/app/index");
/// history.navigate("#RouteB");
///
/// assert_eq!(history.location().hash, "#RouteB");
/// assert!(history.poll_event().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryHistory {
    /// History with a single state-less entry at `url`.
    pub fn new(url: &str) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                entries: vec![Entry {
                    location: Location::parse(url),
                    state: None,
                }],
                index: 0,
                pending: VecDeque::new(),
                history_api: true,
                persist: true,
            })),
        }
    }

    /// Emulate a platform without the history API (paths must use the fragment).
    pub fn with_history_api(self, supported: bool) -> Self {
        self.inner.borrow_mut().history_api = supported;
        self
    }

    /// Emulate a document whose entry payloads cannot be written on load.
    pub fn with_persistent_state(self, persist: bool) -> Self {
        self.inner.borrow_mut().persist = persist;
        self
    }

    /// Simulate the user entering `url` or following a plain link.
    pub fn navigate(&self, url: &str) {
        let mut inner = self.inner.borrow_mut();
        let location = inner.current_location().resolve(url);
        inner.push(Entry {
            location,
            state: None,
        });
        inner.pending.push_back(PopStateEvent { state: None });
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// Index of the current entry.
    pub fn index(&self) -> usize {
        self.inner.borrow().index
    }

    /// Full address of the current entry.
    pub fn current_url(&self) -> String {
        self.inner.borrow().current_location().to_string()
    }

    /// Number of undelivered notifications.
    pub fn pending_events(&self) -> usize {
        self.inner.borrow().pending.len()
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl HistoryPlatform for MemoryHistory {
    fn location(&self) -> Location {
        self.inner.borrow().current_location()
    }

    fn state(&self) -> Option<EntryPayload> {
        self.inner
            .borrow()
            .current()
            .and_then(|entry| entry.state.clone())
    }

    fn push_state(&mut self, payload: EntryPayload, url: &str) {
        let mut inner = self.inner.borrow_mut();
        let location = inner.current_location().resolve(url);
        inner.push(Entry {
            location,
            state: Some(payload),
        });
    }

    fn replace_state(&mut self, payload: EntryPayload, url: Option<&str>) {
        let mut inner = self.inner.borrow_mut();
        let location = url.map(|url| inner.current_location().resolve(url));
        if let Some(entry) = inner.current_mut() {
            entry.state = Some(payload);
            if let Some(location) = location {
                entry.location = location;
            }
        }
    }

    fn back(&mut self) {
        let mut inner = self.inner.borrow_mut();
        if inner.index > 0 {
            inner.index -= 1;
            inner.queue_current();
        }
    }

    fn forward(&mut self) {
        let mut inner = self.inner.borrow_mut();
        if inner.index + 1 < inner.entries.len() {
            inner.index += 1;
            inner.queue_current();
        }
    }

    fn poll_event(&mut self) -> Option<PopStateEvent> {
        self.inner.borrow_mut().pending.pop_front()
    }

    fn supports_history_api(&self) -> bool {
        self.inner.borrow().history_api
    }

    fn can_persist_state(&self) -> bool {
        self.inner.borrow().persist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(id: &str) -> EntryPayload {
        EntryPayload {
            id: Some(id.to_string()),
            user: None,
        }
    }

    #[test]
    fn test_history_creation() {
        let history = MemoryHistory::new("/");
        assert_eq!(history.current_url(), "/");
        assert_eq!(history.len(), 1);
        assert!(history.state().is_none());
        assert_eq!(history.pending_events(), 0);
    }

    #[test]
    fn test_location_parse() {
        let location = Location::parse("/users/1?tab=posts#top");
        assert_eq!(location.pathname, "/users/1");
        assert_eq!(location.search, "?tab=posts");
        assert_eq!(location.hash, "#top");
    }

    #[test]
    fn test_location_resolve() {
        let base = Location::parse("/app/index?x=1#old");

        assert_eq!(base.resolve("#RouteB").to_string(), "/app/index?x=1#RouteB");
        assert_eq!(base.resolve("RouteB").to_string(), "/app/RouteB");
        assert_eq!(base.resolve("/RouteB?y=2").to_string(), "/RouteB?y=2");
        assert_eq!(base.resolve("?y=2").to_string(), "/app/index?y=2");
    }

    #[test]
    fn test_history_push() {
        let mut history = MemoryHistory::new("/");

        history.push_state(payload("a_1"), "/users");
        assert_eq!(history.current_url(), "/users");
        assert_eq!(history.len(), 2);
        assert_eq!(history.state(), Some(payload("a_1")));
        assert_eq!(history.pending_events(), 0);
    }

    #[test]
    fn test_history_back_forward() {
        let mut history = MemoryHistory::new("/");
        history.push_state(payload("a_1"), "/page1");
        history.push_state(payload("a_2"), "/page2");

        history.back();
        assert_eq!(history.current_url(), "/page1");
        assert_eq!(
            history.poll_event(),
            Some(PopStateEvent {
                state: Some(payload("a_1"))
            })
        );

        history.forward();
        assert_eq!(history.current_url(), "/page2");
        assert!(history.poll_event().is_some());
        assert!(history.poll_event().is_none());
    }

    #[test]
    fn test_history_boundaries() {
        let mut history = MemoryHistory::new("/");
        history.back();
        history.forward();
        assert_eq!(history.index(), 0);
        assert_eq!(history.pending_events(), 0);
    }

    #[test]
    fn test_history_truncation_on_push() {
        let mut history = MemoryHistory::new("/");
        history.push_state(payload("a_1"), "/page1");
        history.push_state(payload("a_2"), "/page2");
        history.back();

        history.push_state(payload("a_3"), "/page3");
        assert_eq!(history.current_url(), "/page3");
        assert_eq!(history.len(), 3);

        history.forward();
        assert_eq!(history.index(), 2);
    }

    #[test]
    fn test_history_replace() {
        let mut history = MemoryHistory::new("/");
        history.push_state(payload("a_1"), "/page1");

        history.replace_state(payload("a_2"), Some("/page2"));
        assert_eq!(history.current_url(), "/page2");
        assert_eq!(history.len(), 2);

        history.replace_state(payload("a_3"), None);
        assert_eq!(history.current_url(), "/page2");
        assert_eq!(history.state(), Some(payload("a_3")));
    }

    #[test]
    fn test_navigate_pushes_stateless_entry() {
        let history = MemoryHistory::new("/index.html");
        history.navigate("#RouteB");

        let mut platform = history.clone();
        assert_eq!(platform.location().hash, "#RouteB");
        assert!(platform.state().is_none());
        assert_eq!(platform.poll_event(), Some(PopStateEvent { state: None }));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_history_with_state() {
        let mut history = MemoryHistory::new("/");
        let state = HistoryState::new().with("scrollY", "100");

        history.push_state(
            EntryPayload {
                id: Some("a_1".to_string()),
                user: Some(state),
            },
            "/page1",
        );

        let saved = history.state().and_then(|payload| payload.user).unwrap();
        assert_eq!(saved.get("scrollY"), Some("100"));
    }

    #[test]
    fn test_platform_capabilities() {
        let history = MemoryHistory::new("/")
            .with_history_api(false)
            .with_persistent_state(false);
        assert!(!history.supports_history_api());
        assert!(!history.can_persist_state());
    }
}
