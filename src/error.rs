//! Push server error types.
//!
//! [`PushError`] is the central error type. None of its variants is fatal
//! once the server is running: malformed input is logged and dropped, a
//! closed connection discards its pending work. Only configuration errors
//! surface from `main`.
//!
//! Backpressure is deliberately absent: a full transport is a transient
//! state of the send queue, see [`crate::delivery::SendOutcome`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body used by the HTTP diagnostics.
///
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "malformed control message: missing field `uuid`"
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Server-side error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category            |
/// |-----------|---------------------|
/// | 1000–1999 | Malformed input     |
/// | 2000–2999 | Connection state    |
/// | 3000–3999 | Server / payload    |
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// Control text was not JSON, or lacked the fields its `type` requires.
    #[error("malformed control message: {0}")]
    MalformedControlMessage(String),

    /// A join named a channel other than `binary` or `text`.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// A binary frame failed to decode.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Generator output whose array lengths disagree with its vertex count.
    #[error("invalid point cloud: {0}")]
    InvalidPointCloud(String),

    /// The payload would need more chunks than a `u32` index can address.
    #[error("payload too large: {chunks} chunks exceed the chunk index range")]
    PayloadTooLarge {
        /// Number of chunks the payload would have required.
        chunks: usize,
    },

    /// The transport connection is gone.
    #[error("connection closed")]
    ConnectionClosed,

    /// Rejected configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PushError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::MalformedControlMessage(_) => 1001,
            Self::UnknownChannel(_) => 1002,
            Self::MalformedFrame(_) => 1003,
            Self::ConnectionClosed => 2001,
            Self::InvalidPointCloud(_) => 3001,
            Self::PayloadTooLarge { .. } => 3002,
            Self::InvalidConfig(_) => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedControlMessage(_) | Self::UnknownChannel(_) | Self::MalformedFrame(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::ConnectionClosed => StatusCode::GONE,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidPointCloud(_) | Self::InvalidConfig(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PushError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_input_maps_to_bad_request() {
        let err = PushError::MalformedControlMessage("missing field `uuid`".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), 1001);
        assert_eq!(
            err.to_string(),
            "malformed control message: missing field `uuid`"
        );
    }

    #[test]
    fn into_response_carries_status() {
        let response = PushError::PayloadTooLarge { chunks: 7 }.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
