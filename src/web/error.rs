use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Failures a request handler can hit after input validation has passed.
///
/// These are all server-side faults. The full error is logged and the
/// browser gets an opaque 500 so nothing internal leaks into a response.
#[derive(Debug, Error)]
pub enum WebError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_responds_with_opaque_500() {
        let response = WebError::PasswordHash("bad salt".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_database_errors_convert_via_from() {
        let err = WebError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, WebError::Database(_)));
    }
}
