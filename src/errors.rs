use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;

use crate::models::BookingStatus;

/// Per-request validation failures from the availability and lifecycle rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectionReason {
    #[error("invalid date range: end {end} must be after start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("rental length of {days} days is outside the allowed {min}-{max} days")]
    DurationOutOfBounds { days: i64, min: i64, max: i64 },

    #[error("the requested dates are not available")]
    DateConflict,

    #[error("booking is already {0}")]
    AlreadyFinalized(BookingStatus),

    #[error("booking can no longer be cancelled: the rental has started")]
    PastStart,

    #[error("the dates were taken by another booking; refresh availability and retry")]
    StorageConflict,

    #[error("cannot move booking from {from} to {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },

    #[error("a note is required when staff cancel a booking")]
    NoteRequired,
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::InvalidRange { .. } => "invalid_range",
            RejectionReason::DurationOutOfBounds { .. } => "duration_out_of_bounds",
            RejectionReason::DateConflict => "date_conflict",
            RejectionReason::AlreadyFinalized(_) => "already_finalized",
            RejectionReason::PastStart => "past_start",
            RejectionReason::StorageConflict => "storage_conflict",
            RejectionReason::InvalidTransition { .. } => "invalid_transition",
            RejectionReason::NoteRequired => "note_required",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RejectionReason::InvalidRange { .. } | RejectionReason::NoteRequired => {
                StatusCode::BAD_REQUEST
            }
            RejectionReason::DurationOutOfBounds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RejectionReason::DateConflict
            | RejectionReason::AlreadyFinalized(_)
            | RejectionReason::PastStart
            | RejectionReason::StorageConflict
            | RejectionReason::InvalidTransition { .. } => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Rejected(#[from] RejectionReason),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "internal",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::BadRequest(_) => "bad_request",
            AppError::Rejected(reason) => reason.code(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Rejected(reason) => reason.status(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string(), "code": self.code() });
        (status, axum::Json(body)).into_response()
    }
}
