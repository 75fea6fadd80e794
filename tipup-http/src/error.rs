//! Error types for the payment requester.

use reqwest::StatusCode;
use tipup::PreconditionError;

/// Fallback when a failed response carries no `error` message.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error occurred";

/// Errors that can occur while requesting a payment.
///
/// None of these are retried. A payment request is a charge attempt, so the
/// caller decides whether sending it again is safe.
#[derive(Debug, thiserror::Error)]
pub enum PaymentClientError {
    /// A precondition failed; no request was sent.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// The service answered with a non-success status.
    #[error("request_payment: {message}")]
    Remote {
        /// HTTP status of the response.
        status: StatusCode,
        /// The service's `error` field, or [`UNKNOWN_ERROR_MESSAGE`].
        message: String,
    },

    /// URL construction failed.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// HTTP transport error (connection refused, timeout, ...).
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// A success response did not contain a valid payment result.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

impl PaymentClientError {
    /// The service-supplied message, for [`PaymentClientError::Remote`].
    #[must_use]
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            Self::Remote { message, .. } => Some(message),
            _ => None,
        }
    }
}
