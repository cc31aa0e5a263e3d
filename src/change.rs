//! Interceptable path change
//!
//! Every navigation that can be intercepted is announced as a
//! [`RouteChangeEvent`] before it commits. A listener may [`abort`] it, which
//! keeps the current path, or [`redirect`] it to another path. The last
//! decision made by any listener wins.
//!
//! [`abort`]: RouteChangeEvent::abort
//! [`redirect`]: RouteChangeEvent::redirect

/// What listeners decided about a pending change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangeDecision {
    /// Let the change commit.
    #[default]
    None,
    /// Stay on the old path.
    Abort,
    /// Go to `new_path` instead.
    Redirect,
}

/// A pending change from `old_path` to `new_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteChangeEvent {
    old_path: Option<String>,
    new_path: String,
    decision: ChangeDecision,
}

impl RouteChangeEvent {
    /// `old_path` is `None` before the first commit.
    pub fn new(new_path: impl Into<String>, old_path: Option<String>) -> Self {
        Self {
            old_path,
            new_path: new_path.into(),
            decision: ChangeDecision::None,
        }
    }

    /// Keep the current path. `new_path` is reset to the old path.
    pub fn abort(&mut self) {
        self.decision = ChangeDecision::Abort;
        self.new_path = self.old_path.clone().unwrap_or_default();
    }

    /// Navigate to `path` instead.
    pub fn redirect(&mut self, path: impl Into<String>) {
        self.decision = ChangeDecision::Redirect;
        self.new_path = path.into();
    }

    pub fn old_path(&self) -> Option<&str> {
        self.old_path.as_deref()
    }

    pub fn new_path(&self) -> &str {
        &self.new_path
    }

    pub fn decision(&self) -> ChangeDecision {
        self.decision
    }

    pub fn is_aborted(&self) -> bool {
        self.decision == ChangeDecision::Abort
    }

    pub fn is_redirected(&self) -> bool {
        self.decision == ChangeDecision::Redirect
    }

    pub fn into_new_path(self) -> String {
        self.new_path
    }
}
