//! Logging abstraction layer
//!
//! The router logs through these macros so the backend can be chosen at
//! compile time:
//!
//! - `log` (default) - routes through the standard `log` crate
//! - `tracing` - routes through `tracing`
//!
//! The features are mutually exclusive. With neither enabled the macros expand
//! to nothing.
//!
//! # Usage
//!
//! ```ignore
//! use history_router::{debug_log, trace_log, warn_log};
//!
//! trace_log!("resolving '{}'", path);
//! debug_log!("committed path change: {:?} -> '{}'", previous, path);
//! warn_log!("no match for path '{}'", path);
//! ```

/// Trace-level logging. Used for per-resolution detail.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!($($arg)*);
        #[cfg(feature = "log")]
        ::log::trace!($($arg)*);
    };
}

/// Debug-level logging. Used for transitions and route swaps.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!($($arg)*);
        #[cfg(feature = "log")]
        ::log::debug!($($arg)*);
    };
}

/// Info-level logging.
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::info!($($arg)*);
        #[cfg(feature = "log")]
        ::log::info!($($arg)*);
    };
}

/// Warn-level logging. Every [`Diagnostic`](crate::Diagnostic) ends up here.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::warn!($($arg)*);
        #[cfg(feature = "log")]
        ::log::warn!($($arg)*);
    };
}

/// Error-level logging.
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::error!($($arg)*);
        #[cfg(feature = "log")]
        ::log::error!($($arg)*);
    };
}
