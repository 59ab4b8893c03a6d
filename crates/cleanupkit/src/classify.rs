//! Failure classification.
//!
//! Every failure surfaced in a row goes through [`format_user_message`], so
//! two failures with the same remote code always render the same text.

use crate::error::{Error, RemoteError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

const TIMEOUT_CODE: &str = "Timeout";
const TIMEOUT_MESSAGE: &str = "request timed out before a response was returned";
const UNKNOWN_CODE: &str = "UnknownError";

/// Normalized category for remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AccessDenied,
    NotFound,
    Throttled,
    Validation,
    Timeout,
    #[default]
    Unknown,
}

impl ErrorKind {
    /// Map a provider error code onto a kind.
    ///
    /// Rules are case-insensitive substring matches, evaluated in order.
    pub fn from_code(code: &str) -> Self {
        let lower = code.to_lowercase();
        let has = |needle: &str| lower.contains(needle);

        if has("accessdenied") || has("unauthorized") {
            Self::AccessDenied
        } else if has("notfound") || has("nosuch") {
            Self::NotFound
        } else if has("throttl") || has("toomanyrequests") {
            Self::Throttled
        } else if has("validation") || has("invalid") {
            Self::Validation
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "access_denied",
            Self::NotFound => "not_found",
            Self::Throttled => "throttled",
            Self::Validation => "validation",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure mapped onto an [`ErrorKind`] plus the code and message shown to users.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedError<'a> {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    /// The failure this was derived from, absent for the empty classification
    pub cause: Option<&'a anyhow::Error>,
}

impl ClassifiedError<'_> {
    /// `"<message> (<code>)"` when a code is present, otherwise the bare message.
    pub fn user_message(&self) -> String {
        if self.code.is_empty() {
            self.message.clone()
        } else {
            format!("{} ({})", self.message, self.code)
        }
    }
}

impl fmt::Display for ClassifiedError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

/// Classify a failure by walking its cause chain.
///
/// Interruptions (cancel token, deadline, I/O timeouts) win over remote
/// errors, which win over everything else.
pub fn classify(err: &anyhow::Error) -> ClassifiedError<'_> {
    if is_timeout(err) {
        return ClassifiedError {
            kind: ErrorKind::Timeout,
            code: TIMEOUT_CODE.to_string(),
            message: TIMEOUT_MESSAGE.to_string(),
            cause: Some(err),
        };
    }

    if let Some(remote) = err.chain().find_map(|e| e.downcast_ref::<RemoteError>()) {
        let message = if remote.message.is_empty() {
            format!("{err:#}")
        } else {
            remote.message.clone()
        };
        return ClassifiedError {
            kind: ErrorKind::from_code(&remote.code),
            code: remote.code.clone(),
            message,
            cause: Some(err),
        };
    }

    ClassifiedError {
        kind: ErrorKind::Unknown,
        code: UNKNOWN_CODE.to_string(),
        message: err.to_string(),
        cause: Some(err),
    }
}

/// Human-readable text for a failure; empty when there is no failure.
pub fn format_user_message(err: Option<&anyhow::Error>) -> String {
    err.map(|e| classify(e).user_message()).unwrap_or_default()
}

fn is_timeout(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(own) = cause.downcast_ref::<Error>() {
            return own.is_interrupted();
        }
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|io_err| io_err.kind() == io::ErrorKind::TimedOut)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn remote(code: &str, message: &str) -> anyhow::Error {
        anyhow::Error::new(RemoteError::new(code, message))
    }

    #[test]
    fn test_classify_remote_kinds() {
        let cases = [
            ("AccessDeniedException", ErrorKind::AccessDenied),
            ("UnauthorizedOperation", ErrorKind::AccessDenied),
            ("ResourceNotFoundException", ErrorKind::NotFound),
            ("NoSuchEntity", ErrorKind::NotFound),
            ("ThrottlingException", ErrorKind::Throttled),
            ("TooManyRequestsException", ErrorKind::Throttled),
            ("ValidationException", ErrorKind::Validation),
            ("InvalidParameterValue", ErrorKind::Validation),
            ("InternalFailure", ErrorKind::Unknown),
        ];

        for (code, want) in cases {
            let err = remote(code, "msg").context("wrapped");
            let classified = classify(&err);
            assert_eq!(classified.kind, want, "kind for {code}");
            assert_eq!(classified.code, code);
            assert_eq!(classified.message, "msg");
        }
    }

    #[test]
    fn test_precedence_follows_rule_order() {
        // Both "accessdenied" and "notfound" appear; access denied wins.
        assert_eq!(
            ErrorKind::from_code("AccessDeniedNotFound"),
            ErrorKind::AccessDenied
        );
        assert_eq!(
            ErrorKind::from_code("InvalidThrottle"),
            ErrorKind::Throttled
        );
    }

    #[test]
    fn test_classify_interruptions_as_timeout() {
        for err in [
            anyhow::Error::new(Error::Cancelled),
            anyhow::Error::new(Error::DeadlineExceeded).context("describe operation"),
            anyhow::Error::new(io::Error::new(io::ErrorKind::TimedOut, "slow")),
        ] {
            let classified = classify(&err);
            assert_eq!(classified.kind, ErrorKind::Timeout);
            assert_eq!(classified.code, "Timeout");
            assert_eq!(
                classified.message,
                "request timed out before a response was returned"
            );
        }
    }

    #[test]
    fn test_classify_unknown() {
        let err = anyhow!("random");
        let classified = classify(&err);
        assert_eq!(classified.kind, ErrorKind::Unknown);
        assert_eq!(classified.code, "UnknownError");
        assert_eq!(classified.message, "random");
        assert!(classified.cause.is_some());
    }

    #[test]
    fn test_empty_remote_message_falls_back_to_error_text() {
        let err = remote("InternalFailure", "").context("delete user");
        let classified = classify(&err);
        assert_eq!(classified.message, "delete user: api error InternalFailure");
        assert_eq!(
            classified.user_message(),
            "delete user: api error InternalFailure (InternalFailure)"
        );

        let bare = remote("InternalFailure", "");
        assert_eq!(classify(&bare).message, "api error InternalFailure");
    }

    #[test]
    fn test_format_user_message() {
        let err = remote("ValidationException", "bad request");
        assert_eq!(
            format_user_message(Some(&err)),
            "bad request (ValidationException)"
        );
        assert_eq!(format_user_message(None), "");
    }

    #[test]
    fn test_format_is_deterministic() {
        let err = remote("ThrottlingException", "Rate exceeded");
        let first = classify(&err).to_string();
        let second = classify(&err).to_string();
        assert_eq!(first, second);
        assert_eq!(first, "Rate exceeded (ThrottlingException)");

        let other = remote("ThrottlingException", "Rate exceeded").context("list keys");
        assert_eq!(format_user_message(Some(&other)), first);
    }

    #[test]
    fn test_default_classification_is_empty() {
        let empty = ClassifiedError::default();
        assert_eq!(empty.kind, ErrorKind::Unknown);
        assert_eq!(empty.user_message(), "");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::AccessDenied).unwrap();
        assert_eq!(json, "\"access_denied\"");
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }
}
