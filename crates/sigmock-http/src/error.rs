//! Error types for the mock dispatcher and transports.

use http::Method;

/// A failure reported by a [`Responder`](crate::Responder).
///
/// The message is passed through to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ResponderError {
    message: String,
}

impl ResponderError {
    /// Create a responder error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The handler's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors produced by [`MockDispatcher`](crate::MockDispatcher).
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No registration matched and no catch-all responder is set.
    #[error("no responder found for {method} {url}")]
    NoResponder {
        /// Method of the unmatched request.
        method: Method,
        /// Full URL of the unmatched request.
        url: String,
    },

    /// The dispatcher was used while deactivated.
    #[error("mock dispatcher is not active")]
    Inactive,

    /// A `=~` pattern did not compile.
    #[error("invalid URL pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The matched responder failed.
    #[error(transparent)]
    Responder(#[from] ResponderError),
}

/// Errors produced by an [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The mock dispatcher refused or failed the request.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The real network path failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}
