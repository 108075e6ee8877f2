//! Error types for the Fieldbook client.
//!
//! # Design
//! Four outcomes are distinguished, by where the exchange stopped:
//! `MalformedQuery` never left the client, `Transport` never completed an
//! HTTP exchange, `ApiError` is a non-2xx answer from the server, and
//! `UnexpectedResponseShape` is a 2xx answer whose payload did not fit the
//! operation.

use thiserror::Error;

/// Message used when an error response carries no `message` field.
pub const NO_DETAILS: &str = "No details";

/// Errors delivered by `FieldbookClient` parse methods and `Session` calls.
#[derive(Debug, Error)]
pub enum SdkError {
    /// The request could not be constructed; nothing was sent.
    #[error("failed to generate query URL: {0}")]
    MalformedQuery(String),

    /// The server answered 2xx but the payload was missing or had the wrong
    /// shape for the operation.
    #[error("unexpected response from API")]
    UnexpectedResponseShape,

    /// The server answered with a status outside [200, 300).
    #[error("Unexpected FieldbookAPI error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// No HTTP exchange completed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SdkError {
    /// HTTP status for `ApiError`, `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            SdkError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Boxed cause carried by `TransportError::Exchange`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures reported by a `Transport` before a complete response was
/// received.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP exchange failed: {0}")]
    Exchange(#[source] BoxError),

    /// The worker running the exchange stopped before producing a result.
    #[error("transport worker stopped: {0}")]
    Interrupted(String),
}

impl TransportError {
    pub fn exchange(cause: impl Into<BoxError>) -> Self {
        TransportError::Exchange(cause.into())
    }
}
