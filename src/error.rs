//! Error types for the router
//!
//! Only programming errors are surfaced as `Err`: invalid path expressions at
//! registration time and link affordances used outside a router. Everything
//! else (duplicate defaults, ambiguous matches, malformed input) is reported
//! through [`diagnostics`](crate::diagnostics) and navigation proceeds.

use thiserror::Error;

/// A path expression that cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// Pattern was empty.
    #[error("route pattern cannot be empty - for the default route, use \"$default\"")]
    Empty,

    /// A `:` with no name after it.
    #[error("parameter name cannot be empty in pattern '{pattern}'")]
    EmptyParamName { pattern: String },

    /// Parameter name with characters outside `[A-Za-z0-9_]`.
    #[error(
        "parameter '{name}' in pattern '{pattern}' must contain only alphanumeric characters and underscores"
    )]
    InvalidParamName { pattern: String, name: String },

    /// Same parameter name used twice.
    #[error("duplicate parameter '{name}' in pattern '{pattern}'")]
    DuplicateParam { pattern: String, name: String },

    /// `*` anywhere but the last segment.
    #[error("wildcard must be the last segment of pattern '{pattern}'")]
    WildcardNotLast { pattern: String },

    /// `:` or `*` mixed into a literal segment.
    #[error("segment '{segment}' in pattern '{pattern}' mixes literal text with a parameter")]
    PartialSegment { pattern: String, segment: String },

    /// Two slashes in a row.
    #[error("pattern '{pattern}' cannot contain consecutive slashes")]
    ConsecutiveSlashes { pattern: String },
}

/// Errors returned by the router API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// Registration failed because the pattern is invalid.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// A link or nested router was constructed without an enclosing router.
    #[error("a router link or nested router can only be used inside an active router")]
    NoActiveRouter,

    /// Navigation was requested while the synchronizer is dispatching a change.
    #[error("cannot navigate to '{path}' while a path change is being dispatched")]
    ReentrantNavigation { path: String },

    /// History access other than navigating to a path (`back`, `forward`,
    /// `set_state`, listener registration) during a dispatch.
    #[error("cannot {action} while a path change is being dispatched")]
    ReentrantAccess { action: &'static str },
}

/// Result alias for router operations.
pub type RouterResult<T> = Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_error_display() {
        let error = PatternError::DuplicateParam {
            pattern: "/a/:id/:id".to_string(),
            name: "id".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "duplicate parameter 'id' in pattern '/a/:id/:id'"
        );
    }

    #[test]
    fn test_router_error_from_pattern() {
        let error: RouterError = PatternError::Empty.into();
        assert!(matches!(error, RouterError::Pattern(PatternError::Empty)));
        assert!(error.to_string().contains("$default"));
    }

    #[test]
    fn test_reentrant_access_display() {
        let error = RouterError::ReentrantAccess { action: "go back" };
        assert_eq!(
            error.to_string(),
            "cannot go back while a path change is being dispatched"
        );
    }

    #[test]
    fn test_no_active_router_display() {
        assert_eq!(
            RouterError::NoActiveRouter.to_string(),
            "a router link or nested router can only be used inside an active router"
        );
    }
}
