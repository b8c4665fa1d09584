//! Error types for reflex-core operations.

use thiserror::Error;

/// Result type alias for reflex-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to the immediate caller.
///
/// Failures raised by watcher getters or callbacks are not represented here:
/// they unwind through the write that triggered notification.
#[derive(Debug, Error)]
pub enum Error {
    /// The path contains characters outside the accepted identifier set.
    #[error("path is not resolvable: {path:?}")]
    UnresolvablePath {
        /// The rejected path string.
        path: String,
    },

    /// Array index is out of bounds.
    #[error("index {index} out of bounds (len: {len})")]
    IndexOutOfBounds {
        /// The index that was accessed.
        index: usize,
        /// The actual length of the array.
        len: usize,
    },

    /// A debouncer was created outside of a tokio runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

impl Error {
    /// Create an unresolvable path error.
    #[inline]
    pub fn unresolvable_path(path: impl Into<String>) -> Self {
        Error::UnresolvablePath { path: path.into() }
    }

    /// Create an index out of bounds error.
    #[inline]
    pub fn index_out_of_bounds(index: usize, len: usize) -> Self {
        Error::IndexOutOfBounds { index, len }
    }
}
