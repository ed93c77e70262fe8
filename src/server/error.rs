//! API error type: maps crate errors onto status codes and JSON bodies.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Stable machine-readable code.
    pub code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] [{}] {}", self.status.as_u16(), self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::AlreadyRacing => Self::new(StatusCode::CONFLICT, "ALREADY_RACING", message),
            Error::NoActiveRace => Self::new(StatusCode::NOT_FOUND, "NO_ACTIVE_RACE", message),
            Error::PuzzleFetchFailed(_) | Error::Http(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "PUZZLE_FETCH_FAILED", message)
            }
            Error::PartLocked { .. } => Self::new(StatusCode::NOT_FOUND, "PART_LOCKED", message),
            Error::PartNotUnlocked(_) => {
                Self::new(StatusCode::CONFLICT, "PART_NOT_UNLOCKED", message)
            }
            Error::AlreadySolved(_) => Self::new(StatusCode::CONFLICT, "ALREADY_SOLVED", message),
            Error::SubmissionRejected { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "SUBMISSION_REJECTED", message)
            }
            Error::MissingSession => Self::new(StatusCode::BAD_REQUEST, "MISSING_SESSION", message),
            Error::InvalidPart(_) => Self::new(StatusCode::BAD_REQUEST, "INVALID_PART", message),
            Error::Validation(_) => Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message),
            _ => Self::internal(message),
        }
    }
}

/// Malformed or mistyped request bodies keep the JSON error shape.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), "INVALID_REQUEST", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // `error` for start-style clients, `message` for submit-style ones.
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.message,
            "message": self.message,
            "code": self.code,
        }));

        (self.status, body).into_response()
    }
}
