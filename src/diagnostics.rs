//! Non-fatal anomaly reporting
//!
//! Configuration anomalies and malformed input never fail navigation. They are
//! logged at warn level and, when the current thread is inside [`capture`],
//! recorded so callers (usually tests) can assert on them.

use crate::warn_log;
use std::cell::RefCell;
use std::fmt;

/// A non-fatal anomaly observed while registering, resolving or navigating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A second `$default` replaced the previous default of a namespace.
    DuplicateDefault { namespace: String },

    /// More than one registered pattern matched; the last one won.
    AmbiguousMatch {
        namespace: String,
        path: String,
        matches: usize,
    },

    /// Resolution against a namespace nothing was registered in.
    UnknownNamespace { namespace: String },

    /// Hash URLs were turned off on a platform without a history API.
    HashUrlsRequired,

    /// A path value that could not be percent-decoded; passed through raw.
    MalformedComponent { value: String },

    /// Nothing matched and there is no default; the current route stays.
    NoMatchingRoute { namespace: String, path: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DuplicateDefault { namespace } => write!(
                f,
                "There is already a default route ($default) in namespace '{}' - this will override the previous default route",
                namespace
            ),
            Diagnostic::AmbiguousMatch {
                namespace,
                path,
                matches,
            } => write!(
                f,
                "More than one match ({}) for path '{}' in namespace '{}' - the last registered route wins",
                matches, path, namespace
            ),
            Diagnostic::UnknownNamespace { namespace } => {
                write!(f, "No paths registered for the namespace: '{}'", namespace)
            }
            Diagnostic::HashUrlsRequired => write!(
                f,
                "Platform does not support the history API, so cannot disable hash URLs"
            ),
            Diagnostic::MalformedComponent { value } => write!(
                f,
                "Invalid URI component '{}' in path - are you percent-encoding values when building paths?",
                value
            ),
            Diagnostic::NoMatchingRoute { namespace, path } => write!(
                f,
                "No match for path '{}' in namespace '{}' - make sure you specify a default route",
                path, namespace
            ),
        }
    }
}

thread_local! {
    static CAPTURED: RefCell<Option<Vec<Diagnostic>>> = const { RefCell::new(None) };
}

/// Report a diagnostic.
pub fn report(diagnostic: Diagnostic) {
    warn_log!("{}", diagnostic);
    CAPTURED.with(|captured| {
        if let Some(list) = captured.borrow_mut().as_mut() {
            list.push(diagnostic);
        }
    });
}

/// Run `f`, collecting every diagnostic reported on this thread meanwhile.
///
/// Captures nest; the inner capture only sees its own diagnostics.
///
/// # Example
///
/// ```
/// use history_router::diagnostics::{capture, report, Diagnostic};
///
/// let ((), diagnostics) = capture(|| report(Diagnostic::HashUrlsRequired));
/// assert_eq!(diagnostics, vec![Diagnostic::HashUrlsRequired]);
/// ```
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<Diagnostic>) {
    struct Restore(Option<Vec<Diagnostic>>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let outer = self.0.take();
            CAPTURED.with(|captured| *captured.borrow_mut() = outer);
        }
    }

    let outer = CAPTURED.with(|captured| captured.borrow_mut().replace(Vec::new()));
    let restore = Restore(outer);
    let result = f();
    let collected = CAPTURED
        .with(|captured| captured.borrow_mut().take())
        .unwrap_or_default();
    drop(restore);
    (result, collected)
}
