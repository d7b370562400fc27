// Error types returned by the mailcow client. Nothing in the library
// terminates the process: every failure comes back as a `MailcowError`
// and the caller decides whether to abort.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, MailcowError>;

#[derive(Error, Debug)]
pub enum MailcowError {
    /// Transport-level failure (connection refused, TLS, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with something that is not the expected shape.
    #[error("API {endpoint}: malformed response: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    /// The API answered with a well-formed envelope whose `type` is not
    /// `success`.
    #[error("API {endpoint}: {kind} - {msg}")]
    Api {
        endpoint: String,
        kind: String,
        msg: String,
    },

    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl MailcowError {
    pub(crate) fn malformed(endpoint: &str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors reported by the remote API itself, as opposed to
    /// transport or shape problems.
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::Api { .. })
    }
}
