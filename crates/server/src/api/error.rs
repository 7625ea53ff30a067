use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tokenlens_core::error::CoreError;

#[derive(Debug)]
pub enum ApiError {
    /// Rejected before the scorer ran; nothing was computed.
    InvalidRequest(String),
    /// The backend failed; the caller may retry. No state was advanced.
    ScorerUnavailable(String),
    /// Non-finite logits or another internal failure.
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidRequest(msg) => ApiError::InvalidRequest(msg),
            CoreError::ScorerUnavailable(msg) => ApiError::ScorerUnavailable(msg),
            CoreError::NumericAnomaly { .. } => ApiError::Internal(err.to_string()),
            CoreError::Codec(e) => ApiError::Internal(e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    r#type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            ApiError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error", None, msg)
            }
            ApiError::ScorerUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "scorer_unavailable",
                Some("retryable"),
                msg,
            ),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None, msg)
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                message,
                r#type: error_type,
                code,
            },
        };

        (status, axum::Json(body)).into_response()
    }
}
