//! History synchronizer
//!
//! Wraps a [`HistoryPlatform`] and turns native back/forward navigation and
//! programmatic `set_path` calls into one linear stream of path changes.
//!
//! Every platform entry written by the synchronizer carries a page id. Ids
//! increase monotonically, so when the user moves through history the
//! synchronizer can tell back (`id == current - 1`) from forward
//! (`id == current + 1`). That direction is what lets an aborted native
//! navigation be undone by moving the other way.
//!
//! Two event streams are exposed:
//!
//! - `change` - emitted before a change commits; listeners receive a mutable
//!   [`RouteChangeEvent`] and may abort or redirect it
//! - `commit` - emitted once a change is final; routers resolve on it

use crate::change::{ChangeDecision, RouteChangeEvent};
use crate::diagnostics::{report, Diagnostic};
use crate::events::{Emitter, SubscriptionId};
use crate::history::{EntryPayload, HistoryPlatform, HistoryState};
use crate::params::QueryParams;
use crate::{debug_log, trace_log, NavigationDirection};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Synchronizer shared between a router and its nested routers.
pub type SharedHistory = Rc<RefCell<HistorySynchronizer>>;

/// Outcome of a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The path equals the last committed path; nothing happened.
    Unchanged,
    /// The notification undid an aborted navigation and was swallowed.
    Ignored,
    /// The change committed.
    Committed { path: String },
    /// A listener aborted the change.
    Aborted,
    /// A listener redirected the change; the target committed instead.
    Redirected { to: String },
}

/// Payload of the `commit` stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedChange {
    /// Committed path without the query string.
    pub path: String,
    /// Committed path including the query string.
    pub full_path: String,
    /// The previously committed full path.
    pub previous_path: Option<String>,
    /// Direction of a native back/forward navigation, if one was detected.
    pub direction: Option<NavigationDirection>,
}

/// Keeps the router's path in step with the platform history.
pub struct HistorySynchronizer {
    platform: Box<dyn HistoryPlatform>,
    use_hash_urls: bool,
    session_tag: String,
    next_page_id: u64,
    current_page_id: Option<u64>,
    user_state: Option<HistoryState>,
    full_path: String,
    path: String,
    query_params: QueryParams,
    previous_path: Option<String>,
    ignore_next_pop_event: bool,
    change: Emitter<RouteChangeEvent>,
    commit: Emitter<CommittedChange>,
}

impl HistorySynchronizer {
    /// Wrap `platform`. Call [`init`](Self::init) to read the initial location.
    pub fn new(platform: impl HistoryPlatform + 'static, use_hash_urls: bool) -> Self {
        let mut synchronizer = Self {
            platform: Box::new(platform),
            use_hash_urls: true,
            session_tag: format!("{:08x}", fastrand::u32(..)),
            next_page_id: 1,
            current_page_id: None,
            user_state: None,
            full_path: String::new(),
            path: String::new(),
            query_params: QueryParams::new(),
            previous_path: None,
            ignore_next_pop_event: false,
            change: Emitter::new(),
            commit: Emitter::new(),
        };
        synchronizer.set_use_hash_urls(use_hash_urls);
        synchronizer
    }

    pub fn into_shared(self) -> SharedHistory {
        Rc::new(RefCell::new(self))
    }

    // ========================================================================
    // Native navigation
    // ========================================================================

    /// Process the platform's current location as a native navigation.
    pub fn init(&mut self) -> Transition {
        let state = self.platform.state();
        self.handle_pop_state(state)
    }

    /// Process one pending platform notification, if any.
    pub fn poll_event(&mut self) -> Option<Transition> {
        let event = self.platform.poll_event()?;
        Some(self.handle_pop_state(event.state))
    }

    /// Process every pending platform notification.
    pub fn poll(&mut self) -> Vec<Transition> {
        std::iter::from_fn(|| self.poll_event()).collect()
    }

    /// Handle a "user navigated" notification carrying `state`.
    pub fn handle_pop_state(&mut self, state: Option<EntryPayload>) -> Transition {
        let location = self.platform.location();
        let raw = if self.use_hash_urls() {
            location.hash
        } else {
            format!("{}{}", location.pathname, location.search)
        };
        let new_path = raw.strip_prefix('#').unwrap_or(&raw).to_string();

        let user = state.as_ref().and_then(|payload| payload.user.clone());
        let recovered = state
            .as_ref()
            .and_then(|payload| payload.id.as_deref())
            .and_then(|id| self.parse_page_id(id));

        let page_id = match recovered {
            Some(page_id) => page_id,
            None => {
                // Entered directly: tag the entry so later pops can be correlated.
                let page_id = self.mint_page_id();
                if self.platform.can_persist_state() {
                    let payload = self.payload(Some(page_id), user.clone());
                    self.platform.replace_state(payload, None);
                }
                page_id
            }
        };

        let direction = self.current_page_id.and_then(|current| {
            if current.checked_sub(1) == Some(page_id) {
                Some(NavigationDirection::Back)
            } else if current.checked_add(1) == Some(page_id) {
                Some(NavigationDirection::Forward)
            } else {
                None
            }
        });

        self.current_page_id = Some(page_id);
        self.user_state = user;

        if self.ignore_next_pop_event {
            self.ignore_next_pop_event = false;
            trace_log!("Ignoring pop to '{}' after an aborted navigation", new_path);
            return Transition::Ignored;
        }

        debug_log!("Native navigation to '{}' ({:?})", new_path, direction);
        self.update_path(new_path, true, direction)
    }

    // ========================================================================
    // Programmatic navigation
    // ========================================================================

    /// Navigate to `path`, pushing a new entry or replacing the current one.
    ///
    /// Replacing navigations are not intercepted.
    pub fn set_path(&mut self, path: &str, replace: bool) -> Transition {
        let url = if self.use_hash_urls() {
            format!("#{}", path)
        } else {
            path.to_string()
        };

        let page_id = self.mint_page_id();
        self.current_page_id = Some(page_id);
        let payload = self.payload(Some(page_id), self.user_state.clone());
        if replace {
            self.platform.replace_state(payload, Some(&url));
        } else {
            self.platform.push_state(payload, &url);
        }

        debug_log!("Setting path '{}' (replace: {})", path, replace);
        // A programmatic push is undone by going back.
        let direction = (!replace).then_some(NavigationDirection::Forward);
        self.update_path(path.to_string(), !replace, direction)
    }

    fn update_path(
        &mut self,
        full_path: String,
        can_intercept: bool,
        direction: Option<NavigationDirection>,
    ) -> Transition {
        if self.previous_path.as_deref() == Some(full_path.as_str()) {
            trace_log!("Path '{}' unchanged", full_path);
            return Transition::Unchanged;
        }

        if can_intercept {
            let mut event = RouteChangeEvent::new(full_path.clone(), self.previous_path.clone());
            self.change.emit(&mut event);

            match (event.decision(), direction) {
                (ChangeDecision::Abort, Some(direction)) => {
                    debug_log!("Navigation to '{}' aborted, undoing it", full_path);
                    self.ignore_next_pop_event = true;
                    match direction.reverse() {
                        NavigationDirection::Back => self.platform.back(),
                        NavigationDirection::Forward => self.platform.forward(),
                    }
                    return Transition::Aborted;
                }
                (ChangeDecision::Abort, None) => {
                    debug_log!("Navigation to '{}' aborted", full_path);
                    self.set_path(event.new_path(), true);
                    return Transition::Aborted;
                }
                (ChangeDecision::Redirect, _) => {
                    let to = event.into_new_path();
                    debug_log!("Navigation to '{}' redirected to '{}'", full_path, to);
                    self.set_path(&to, true);
                    return Transition::Redirected { to };
                }
                (ChangeDecision::None, _) => {}
            }
        }

        self.commit(full_path, direction)
    }

    fn commit(&mut self, full_path: String, direction: Option<NavigationDirection>) -> Transition {
        let (path, query_params) = match full_path.split_once('?') {
            Some((path, query)) => (path.to_string(), QueryParams::from_query_string(query)),
            None => (full_path.clone(), QueryParams::new()),
        };

        let previous_path = self.previous_path.replace(full_path.clone());
        self.path = path.clone();
        self.query_params = query_params;
        self.full_path = full_path.clone();

        debug_log!("Committed path '{}'", full_path);
        let mut committed = CommittedChange {
            path: path.clone(),
            full_path,
            previous_path,
            direction,
        };
        self.commit.emit(&mut committed);

        Transition::Committed { path }
    }

    /// Move one entry back. The result is observed on the next poll.
    pub fn back(&mut self) {
        self.platform.back();
    }

    /// Move one entry forward. The result is observed on the next poll.
    pub fn forward(&mut self) {
        self.platform.forward();
    }

    // ========================================================================
    // Entry state
    // ========================================================================

    /// Attach `data` to the current history entry.
    pub fn set_state(&mut self, data: HistoryState) {
        self.user_state = Some(data);
        let payload = self.payload(self.current_page_id, self.user_state.clone());
        self.platform.replace_state(payload, None);
    }

    /// Data attached to the current history entry.
    pub fn state(&self) -> Option<&HistoryState> {
        self.user_state.as_ref()
    }

    /// Identifier of the current history entry; `None` before one was read.
    pub fn history_id(&self) -> Option<String> {
        self.current_page_id.map(|page_id| self.page_key(page_id))
    }

    fn mint_page_id(&mut self) -> u64 {
        let page_id = self.next_page_id;
        self.next_page_id += 1;
        page_id
    }

    fn page_key(&self, page_id: u64) -> String {
        format!("{}_{}", self.session_tag, page_id)
    }

    fn parse_page_id(&self, id: &str) -> Option<u64> {
        id.strip_prefix(self.session_tag.as_str())?
            .strip_prefix('_')?
            .parse()
            .ok()
    }

    fn payload(&self, page_id: Option<u64>, user: Option<HistoryState>) -> EntryPayload {
        EntryPayload {
            id: page_id.map(|page_id| self.page_key(page_id)),
            user,
        }
    }

    // ========================================================================
    // Configuration and accessors
    // ========================================================================

    /// Whether paths live in the URL fragment.
    pub fn use_hash_urls(&self) -> bool {
        self.use_hash_urls || !self.platform.supports_history_api()
    }

    /// Takes effect on the next `set_path`. Platforms without a history API
    /// keep hash URLs on.
    pub fn set_use_hash_urls(&mut self, use_hash_urls: bool) {
        if !use_hash_urls && !self.platform.supports_history_api() {
            report(Diagnostic::HashUrlsRequired);
            self.use_hash_urls = true;
            return;
        }
        self.use_hash_urls = use_hash_urls;
    }

    /// Last committed path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last committed path including the query string.
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn query_params(&self) -> &QueryParams {
        &self.query_params
    }

    pub fn previous_path(&self) -> Option<&str> {
        self.previous_path.as_deref()
    }

    pub fn current_page_id(&self) -> Option<u64> {
        self.current_page_id
    }

    // ========================================================================
    // Event streams
    // ========================================================================

    /// Listen for interceptable changes.
    pub fn on_change<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&mut RouteChangeEvent) + 'static,
    {
        self.change.subscribe(listener)
    }

    pub fn off_change(&mut self, id: SubscriptionId) -> bool {
        self.change.unsubscribe(id)
    }

    /// Listen for committed changes.
    pub fn on_commit<F>(&mut self, mut listener: F) -> SubscriptionId
    where
        F: FnMut(&CommittedChange) + 'static,
    {
        self.commit
            .subscribe(move |committed: &mut CommittedChange| listener(committed))
    }

    pub fn off_commit(&mut self, id: SubscriptionId) -> bool {
        self.commit.unsubscribe(id)
    }
}

impl fmt::Debug for HistorySynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistorySynchronizer")
            .field("full_path", &self.full_path)
            .field("current_page_id", &self.current_page_id)
            .field("use_hash_urls", &self.use_hash_urls())
            .field("change", &self.change)
            .field("commit", &self.commit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::capture;
    use crate::history::MemoryHistory;

    fn synchronizer(url: &str) -> (MemoryHistory, HistorySynchronizer) {
        let platform = MemoryHistory::new(url);
        let synchronizer = HistorySynchronizer::new(platform.clone(), true);
        (platform, synchronizer)
    }

    fn record_changes(synchronizer: &mut HistorySynchronizer) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        synchronizer.on_change(move |event| {
            sink.borrow_mut().push(format!(
                "{} -> {}",
                event.old_path().unwrap_or("undefined"),
                event.new_path()
            ));
        });
        log
    }

    #[test]
    fn test_init_reads_hash_and_tags_entry() {
        let (platform, mut synchronizer) = synchronizer("/index.html#RouteB");

        let transition = synchronizer.init();

        assert_eq!(
            transition,
            Transition::Committed {
                path: "RouteB".to_string()
            }
        );
        assert_eq!(synchronizer.current_page_id(), Some(1));
        let id = platform.state().and_then(|payload| payload.id);
        assert_eq!(id, synchronizer.history_id());
        assert_eq!(platform.len(), 1);
    }

    #[test]
    fn test_init_without_persistence_skips_rewrite() {
        let platform = MemoryHistory::new("/#a").with_persistent_state(false);
        let mut synchronizer = HistorySynchronizer::new(platform.clone(), true);
        synchronizer.init();
        assert!(platform.state().is_none());
        assert!(synchronizer.history_id().is_some());
    }

    #[test]
    fn test_history_id_before_init() {
        let (_, synchronizer) = synchronizer("/");
        assert!(synchronizer.history_id().is_none());
    }

    #[test]
    fn test_set_path_pushes_and_commits() {
        let (platform, mut synchronizer) = synchronizer("/");
        synchronizer.init();

        let transition = synchronizer.set_path("users/1?tab=posts", false);

        assert_eq!(
            transition,
            Transition::Committed {
                path: "users/1".to_string()
            }
        );
        assert_eq!(synchronizer.full_path(), "users/1?tab=posts");
        assert_eq!(synchronizer.query_params().get("tab"), Some("posts"));
        assert_eq!(platform.location().hash, "#users/1?tab=posts");
        assert_eq!(platform.len(), 2);
        assert_eq!(synchronizer.current_page_id(), Some(2));
    }

    #[test]
    fn test_same_path_is_unchanged() {
        let (_, mut synchronizer) = synchronizer("/");
        synchronizer.init();
        synchronizer.set_path("RouteB", false);
        let log = record_changes(&mut synchronizer);
        let commits = Rc::new(std::cell::Cell::new(0));
        let counter = Rc::clone(&commits);
        synchronizer.on_commit(move |_| counter.set(counter.get() + 1));

        assert_eq!(synchronizer.set_path("RouteB", false), Transition::Unchanged);
        assert!(log.borrow().is_empty());
        assert_eq!(commits.get(), 0);
    }

    #[test]
    fn test_commit_stream() {
        let (_, mut synchronizer) = synchronizer("/");
        let commits = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&commits);
        synchronizer.on_commit(move |committed| sink.borrow_mut().push(committed.clone()));

        synchronizer.init();
        synchronizer.set_path("RouteB", false);

        let commits = commits.borrow();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[1].previous_path.as_deref(), Some(""));
        assert_eq!(commits[1].path, "RouteB");
    }

    #[test]
    fn test_back_and_forward_detect_direction() {
        let (_, mut synchronizer) = synchronizer("/");
        let commits = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&commits);
        synchronizer.on_commit(move |committed| sink.borrow_mut().push(committed.direction));

        synchronizer.init();
        synchronizer.set_path("RouteB", false);
        synchronizer.back();
        assert_eq!(
            synchronizer.poll(),
            vec![Transition::Committed {
                path: String::new()
            }]
        );
        synchronizer.forward();
        synchronizer.poll();

        assert_eq!(
            *commits.borrow(),
            vec![
                None,
                Some(NavigationDirection::Forward),
                Some(NavigationDirection::Back),
                Some(NavigationDirection::Forward),
            ]
        );
    }

    #[test]
    fn test_native_abort_reverses_navigation() {
        let (platform, mut synchronizer) = synchronizer("/");
        synchronizer.init();
        synchronizer.set_path("RouteB", false);
        synchronizer.on_change(|event| event.abort());

        synchronizer.back();
        let transitions = synchronizer.poll();

        assert_eq!(transitions, vec![Transition::Aborted, Transition::Ignored]);
        assert_eq!(synchronizer.full_path(), "RouteB");
        assert_eq!(platform.index(), 1);
    }

    #[test]
    fn test_programmatic_abort_goes_back() {
        let (platform, mut synchronizer) = synchronizer("/");
        synchronizer.init();
        synchronizer.on_change(|event| event.abort());

        assert_eq!(synchronizer.set_path("RouteB", false), Transition::Aborted);
        assert_eq!(synchronizer.poll(), vec![Transition::Ignored]);
        assert_eq!(synchronizer.full_path(), "");
        assert_eq!(platform.index(), 0);
        assert_eq!(platform.len(), 2);
    }

    #[test]
    fn test_abort_without_direction_replaces() {
        let (platform, mut synchronizer) = synchronizer("/");
        synchronizer.init();
        synchronizer.set_path("a", false);
        synchronizer.set_path("b", false);
        synchronizer.back();
        synchronizer.poll();
        synchronizer.on_change(|event| event.abort());

        // The minted id is not adjacent to the current one.
        platform.navigate("#c");

        assert_eq!(synchronizer.poll(), vec![Transition::Aborted]);
        assert_eq!(platform.location().hash, "#a");
        assert_eq!(platform.len(), 3);
        assert_eq!(synchronizer.full_path(), "a");
    }

    #[test]
    fn test_redirect_commits_target_without_interception() {
        let (platform, mut synchronizer) = synchronizer("/");
        synchronizer.init();
        let log = record_changes(&mut synchronizer);
        synchronizer.on_change(|event| {
            if event.new_path() == "old" {
                event.redirect("new");
            }
        });

        let transition = synchronizer.set_path("old", false);

        assert_eq!(
            transition,
            Transition::Redirected {
                to: "new".to_string()
            }
        );
        assert_eq!(*log.borrow(), vec![" -> old"]);
        assert_eq!(synchronizer.full_path(), "new");
        assert_eq!(platform.location().hash, "#new");
        assert_eq!(platform.len(), 2);
    }

    #[test]
    fn test_state_round_trip() {
        let (platform, mut synchronizer) = synchronizer("/");
        synchronizer.init();
        let first_id = synchronizer.history_id();
        synchronizer.set_state(HistoryState::new().with("value", "testState"));

        synchronizer.set_path("RouteB", false);
        assert_ne!(synchronizer.history_id(), first_id);

        synchronizer.back();
        synchronizer.poll();
        assert_eq!(synchronizer.history_id(), first_id);
        assert_eq!(
            synchronizer.state().and_then(|state| state.get("value")),
            Some("testState")
        );
        assert_eq!(platform.index(), 0);
    }

    #[test]
    fn test_foreign_ids_are_ignored() {
        let (platform, mut synchronizer) = synchronizer("/");
        synchronizer.init();
        let mut foreign = platform.clone();
        foreign.push_state(
            EntryPayload {
                id: Some("other_7".to_string()),
                user: None,
            },
            "#RouteB",
        );
        foreign.back();
        foreign.forward();

        let transitions = synchronizer.poll();
        assert_eq!(transitions.len(), 2);
        assert_eq!(synchronizer.full_path(), "RouteB");
        assert_eq!(synchronizer.current_page_id(), Some(2));
    }

    #[test]
    fn test_non_hash_urls() {
        let platform = MemoryHistory::new("/start");
        let mut synchronizer = HistorySynchronizer::new(platform.clone(), false);
        synchronizer.init();
        assert_eq!(synchronizer.full_path(), "/start");

        synchronizer.set_path("/RouteB?x=1", false);
        assert_eq!(platform.current_url(), "/RouteB?x=1");
        assert_eq!(synchronizer.path(), "/RouteB");
    }

    #[test]
    fn test_hash_urls_required_without_history_api() {
        let platform = MemoryHistory::new("/").with_history_api(false);
        let (synchronizer, diagnostics) =
            capture(|| HistorySynchronizer::new(platform.clone(), false));

        assert!(synchronizer.use_hash_urls());
        assert_eq!(diagnostics, vec![Diagnostic::HashUrlsRequired]);
    }
}
