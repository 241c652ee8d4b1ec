//! Error types for the HTTP layer.

use ilp402::PaymentError;

/// Errors returned by [`IlpFetch::fetch`](crate::fetch::IlpFetch::fetch).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header could not be built from the request options.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// The unpaid request failed at the transport level.
    #[error("request failed: {0}")]
    Http(#[from] reqwest_middleware::Error),

    /// Paying for the resource failed.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl FetchError {
    /// Returns the payment error, if this failure happened while paying.
    #[must_use]
    pub const fn as_payment(&self) -> Option<&PaymentError> {
        match self {
            Self::Payment(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors loading a [`ClientConfig`](crate::config::ClientConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration is not valid JSON for the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `payToken` is not unpadded base64url.
    #[error("invalid payToken: {0}")]
    PayToken(#[from] base64::DecodeError),

    /// A configured header name is invalid.
    #[error("invalid header name: {0}")]
    HeaderName(#[from] http::header::InvalidHeaderName),

    /// A configured header value is invalid.
    #[error("invalid header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),
}

/// Errors raised by the payment middleware itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MiddlewareError {
    /// The request body is a stream and cannot be replayed after paying.
    #[error("request is not cloneable, cannot retry after payment")]
    RequestNotCloneable,
}
