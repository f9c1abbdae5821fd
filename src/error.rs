//! Error taxonomy shared by the store, vote processing and the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlinkError {
    /// Referenced blink (or task) id has no record.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed payload: bad vote type, missing user id, empty query.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A collaborator (source, summarizer) failed for one unit of work.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("store error: {0}")]
    Store(String),

    /// Too much pending work to accept more.
    #[error("busy: {0}")]
    Busy(String),
}

pub type Result<T> = std::result::Result<T, BlinkError>;

impl From<std::io::Error> for BlinkError {
    fn from(e: std::io::Error) -> Self {
        BlinkError::Store(e.to_string())
    }
}

impl From<serde_json::Error> for BlinkError {
    fn from(e: serde_json::Error) -> Self {
        BlinkError::Store(e.to_string())
    }
}

impl BlinkError {
    pub fn status(&self) -> StatusCode {
        match self {
            BlinkError::NotFound(_) => StatusCode::NOT_FOUND,
            BlinkError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            BlinkError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            BlinkError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BlinkError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for BlinkError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(target: "api", error = %self, "request failed");
        }
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_status() {
        assert_eq!(BlinkError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            BlinkError::InvalidInput("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BlinkError::UpstreamFailure("x".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            BlinkError::Store("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            BlinkError::Busy("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
