//! Error types for the contract harness.
//!
//! `Failure` is what a rejected [`Pending`](crate::pending::Pending) carries.
//! `TestError` is why a single test step failed. Configuration problems live in
//! [`ConfigError`](crate::config::ConfigError).

use crate::client::ResponseSnapshot;
use std::sync::Arc;
use thiserror::Error;

/// Maximum length for a response body excerpt in failure messages.
const MAX_BODY_EXCERPT_LEN: usize = 256;

/// Category of a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused, reset, DNS failure, or the body could not be read.
    Transport,

    /// The server answered with a non-2xx/3xx status.
    Status { status: u16 },

    /// The response was received but could not be interpreted.
    Decode,
}

/// Rejection of a pending request.
///
/// `reason` is human readable and stable enough to match against substrings,
/// e.g. a 404 produces `"404 Not Found"`.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct Failure {
    pub kind: FailureKind,
    pub reason: String,
    /// The captured response, present for [`FailureKind::Status`].
    pub response: Option<Arc<ResponseSnapshot>>,
}

impl Failure {
    /// Build a transport failure for a request to `url`.
    pub fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        Self {
            kind: FailureKind::Transport,
            reason: format!("request to {} failed: {}", url, err),
            response: None,
        }
    }

    /// Build a status failure from a captured response.
    pub fn status(snapshot: ResponseSnapshot) -> Self {
        let reason = match reqwest::StatusCode::from_u16(snapshot.status)
            .ok()
            .and_then(|s| s.canonical_reason())
        {
            Some(text) => format!("{} {}", snapshot.status, text),
            None => format!("{} Unknown Status", snapshot.status),
        };

        Self {
            kind: FailureKind::Status {
                status: snapshot.status,
            },
            reason,
            response: Some(Arc::new(snapshot)),
        }
    }

    /// Build a decode failure.
    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Decode,
            reason: message.into(),
            response: None,
        }
    }

    /// Status code of the rejected response, if the server answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self.kind {
            FailureKind::Status { status } => Some(status),
            _ => None,
        }
    }

    /// Reason plus a truncated excerpt of the response body, for reports.
    pub fn detail(&self) -> String {
        let body = self
            .response
            .as_ref()
            .and_then(|r| r.body.as_ref())
            .map(|b| b.to_string());

        match body {
            Some(body) => format!("{} (body: {})", self.reason, truncate(&body)),
            None => self.reason.clone(),
        }
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_BODY_EXCERPT_LEN {
        return body.to_string();
    }
    let mut end = MAX_BODY_EXCERPT_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", body.get(..end).unwrap_or_default())
}

/// Why a test step did not pass.
#[derive(Debug, Error)]
pub enum TestError {
    #[error("expected {subject} {expectation}, got {actual}")]
    Mismatch {
        subject: String,
        expectation: String,
        actual: String,
    },

    #[error("request rejected: {}", .0.detail())]
    Rejected(#[from] Failure),

    #[error("expected request to be rejected with reason containing {expected:?}, but it resolved with status {status}")]
    UnexpectedFulfillment { status: u16, expected: String },

    #[error("scenario state has no value for {0:?}")]
    MissingState(String),

    #[error("could not locate resource: {0}")]
    Locate(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("test body panicked: {0}")]
    Panicked(String),
}

/// Result of a hook or test body.
pub type StepResult = Result<(), TestError>;
