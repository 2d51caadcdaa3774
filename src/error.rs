//! Error types for qgemm

use thiserror::Error;

/// Result type alias using qgemm's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur on the safe qgemm surface
///
/// The raw [`dispatch`](crate::dispatch::dispatch) entry point never errors:
/// every unsupported combination is a silent `false`. Errors exist only for
/// the slice-based API, where argument validation can fail before any kernel
/// is considered.
#[derive(Error, Debug)]
pub enum Error {
    /// An operand buffer is too small for the requested dimensions
    #[error("Buffer for operand '{operand}' too small: need {needed} {units}, got {got}")]
    BufferTooSmall {
        /// Which operand failed validation ("A", "B", or "C")
        operand: &'static str,
        /// Required length
        needed: usize,
        /// Actual length
        got: usize,
        /// Unit of the lengths ("elements" or "blocks")
        units: &'static str,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },
}

impl Error {
    /// Create a buffer-too-small error
    pub fn buffer_too_small(
        operand: &'static str,
        needed: usize,
        got: usize,
        units: &'static str,
    ) -> Self {
        Self::BufferTooSmall {
            operand,
            needed,
            got,
            units,
        }
    }

    /// Create an invalid-argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}
