use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Authentication errors for the middleware layer.
///
/// Rejections are deliberately opaque: every gate failure — missing cookie,
/// bad signature, deleted identity, revoked provider token — surfaces as the
/// same "Not Authenticated" response so callers cannot probe which stage
/// failed. The distinguishable cause is logged, never returned.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No valid session for this request.
    #[error("Not Authenticated")]
    Unauthenticated,

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, Json("Not Authenticated")).into_response()
            }
            Self::Config(_) => {
                tracing::error!(error = %self, "Auth internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
