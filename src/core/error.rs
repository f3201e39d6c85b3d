use std::time::Duration;

use thiserror::Error;

/// The primary error type for all fallible operations in this crate.
///
/// Malformed provider records never surface here: the article validator filters them out
/// before they can reach a caller.
#[derive(Debug, Error)]
pub enum DigestError {
    /// An error occurred during an HTTP request.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The upstream service returned an unsuccessful HTTP status code.
    #[error("Unexpected response status: {status} from {endpoint}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The endpoint that returned the error.
        endpoint: String,
    },

    /// An upstream call did not complete before its deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// The operation that was cut off (e.g. `company-news AAPL`).
        operation: String,
        /// The deadline that elapsed.
        after: Duration,
    },

    /// The summarization service failed or produced no text.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The delivery service refused or failed to send a digest.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The list of digest recipients could not be obtained.
    #[error("recipient source unavailable: {0}")]
    RecipientSource(String),

    /// Invalid parameters were provided by the caller.
    #[error("invalid params: {0}")]
    InvalidParams(String),
}

impl DigestError {
    /// True when the error came from an elapsed deadline.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// True when the error originated at an upstream HTTP boundary.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. } | Self::Json(_))
    }

    pub(crate) fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }
}
