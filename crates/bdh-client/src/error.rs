use thiserror::Error;

/// Errors from talking to the BeadHub service.
///
/// `Status` keeps the code and (capped) body so callers can pattern-match;
/// idempotent lookups treat 404 as "not present" rather than a failure.
#[derive(Debug, Error)]
pub enum ApiError {
    /// DNS, connect, or timeout failure before a status line arrived.
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// The server answered with a non-2xx status.
    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body exceeded the configured cap.
    #[error("response exceeded {limit} bytes")]
    ResponseTooLarge { limit: usize },

    /// The body was not the JSON the endpoint promised.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A request could not even be constructed.
    #[error("invalid request URL: {0}")]
    Url(String),
}

impl ApiError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            ApiError::Unreachable(err.without_url().to_string())
        } else {
            ApiError::Unreachable(err.to_string())
        }
    }

    /// True when the status is 404, the "not present" case for idempotent
    /// lookups.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}
