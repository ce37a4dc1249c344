//! Retrieval failures.

use thiserror::Error;

/// Reasons a capture retrieval cannot produce a value.
///
/// Every variant names the frame that asked, so a failing assertion points at
/// the test line rather than at the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Nothing was captured at all.
    #[error("no values captured (requested by {caller})")]
    Empty {
        /// Requesting frame.
        caller: String,
    },
    /// Index past the end of the global sequence.
    #[error("capture index {index} out of range for {len} values (requested by {caller})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of captured values.
        len: usize,
        /// Requesting frame.
        caller: String,
    },
    /// The value at an index has a different type.
    #[error("captured value {index} is a {actual}, not a {expected} (requested by {caller})")]
    TypeMismatch {
        /// Requested index.
        index: usize,
        /// Requested type.
        expected: &'static str,
        /// Captured type.
        actual: &'static str,
        /// Requesting frame.
        caller: String,
    },
    /// No keyed capture has the requested type.
    #[error("no captured values of type {expected} (requested by {caller})")]
    NoneOfType {
        /// Requested type.
        expected: &'static str,
        /// Requesting frame.
        caller: String,
    },
    /// Nothing was captured from inside a mock.
    #[error("no values captured from mocks (requested by {caller})")]
    NoMockCaptures {
        /// Requesting frame.
        caller: String,
    },
    /// The key was never recorded.
    #[error("no captures for mocked call {key:?}; known calls: {known:?} (requested by {caller})")]
    UnknownCall {
        /// Requested key.
        key: String,
        /// Keys that do have captures.
        known: Vec<String>,
        /// Requesting frame.
        caller: String,
    },
    /// The key has captures, but none of the requested type.
    #[error(
        "no captured values of type {expected} from mocked call {key:?}; captured types: {candidates:?} (requested by {caller})"
    )]
    NoneOfTypeFromCall {
        /// Requested key.
        key: String,
        /// Requested type.
        expected: &'static str,
        /// Runtime types of the values captured under the key.
        candidates: Vec<&'static str>,
        /// Requesting frame.
        caller: String,
    },
}

impl CaptureError {
    /// Returns the frame description of the requester.
    #[must_use]
    pub fn caller(&self) -> &str {
        match self {
            Self::Empty { caller }
            | Self::IndexOutOfRange { caller, .. }
            | Self::TypeMismatch { caller, .. }
            | Self::NoneOfType { caller, .. }
            | Self::NoMockCaptures { caller }
            | Self::UnknownCall { caller, .. }
            | Self::NoneOfTypeFromCall { caller, .. } => caller,
        }
    }
}
