//! Error types for cleanup orchestration.
//!
//! [`Error`] covers the failures the engine itself raises (pagination cycles,
//! interrupted waits, malformed cascades). [`RemoteError`] is the structured
//! API failure adapters return so the classifier can read a machine code.

use thiserror::Error;

/// Errors raised by the cleanup engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A listing returned a continuation token it had already returned
    #[error("paginator returned duplicate token {0:?}")]
    DuplicatePageToken(String),

    /// The cancel token was triggered
    #[error("operation cancelled")]
    Cancelled,

    /// The cancel token's deadline passed
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A polled remote operation reached a failed or stopped state
    #[error("{target} {status}{}", reason_suffix(.reason))]
    TerminalState {
        /// What was being waited on
        target: String,
        /// Terminal status reported by the remote
        status: String,
        /// Optional status reason reported by the remote
        reason: Option<String>,
    },

    /// Polling exhausted its attempt budget
    #[error("timed out waiting for {0}")]
    WaitTimedOut(String),

    /// A cascade was built without a terminal operation
    #[error("cascade has no terminal operation")]
    MissingTerminal,

    /// A row index outside the row set
    #[error("row index out of bounds: {0}")]
    RowOutOfBounds(usize),
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason.as_deref().map(str::trim) {
        Some(reason) if !reason.is_empty() => format!(": {reason}"),
        _ => String::new(),
    }
}

impl Error {
    /// Whether this error is an interruption of the caller's cancel token.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// A structured failure returned by a remote API.
///
/// Adapters wrap provider failures in this type so that classification can
/// use the provider's machine-readable code instead of parsing text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{}", self.display_message())]
pub struct RemoteError {
    /// Provider error code, e.g. `NoSuchEntity` or `ThrottlingException`
    pub code: String,
    /// Provider error message, may be empty
    pub message: String,
}

impl RemoteError {
    /// Create a remote error from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    fn display_message(&self) -> String {
        if self.message.is_empty() {
            format!("api error {}", self.code)
        } else {
            format!("api error {}: {}", self.code, self.message)
        }
    }
}
