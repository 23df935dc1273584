use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::{DateTime, FixedOffset};
use serde_json::json;
use thiserror::Error;

use crate::model::attendance::AttendanceEvent;
use crate::model::leave_request::LeaveType;

/// Storage-layer failure, shared by the MySQL repositories and the test fakes.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique key rejected the write (SQLSTATE 23000).
    #[error("conflicting record already exists")]
    Conflict,

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl RepoError {
    /// Maps duplicate-key violations to `Conflict`, everything else to `Database`.
    pub fn from_write(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("23000") {
                return RepoError::Conflict;
            }
        }
        RepoError::Database(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OvertimeBlock {
    DuringShift,
    RegularShiftOpen,
}

impl std::fmt::Display for OvertimeBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OvertimeBlock::DuringShift => f.write_str("the regular shift is in progress"),
            OvertimeBlock::RegularShiftOpen => f.write_str("a regular check-in is still open"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("invalid company timezone: {0}")]
    InvalidTimezone(String),

    #[error("Shift not configured for this employee")]
    ShiftNotConfigured,

    #[error("No valid attendance locations configured")]
    NoValidLocations,

    #[error("No registered face image for this employee")]
    NoFaceReference,

    #[error("Employee is on approved {0} today")]
    OnApprovedLeave(LeaveType),

    #[error("You are outside the allowed attendance area")]
    OutsideGeofence,

    #[error("Face not recognized")]
    FaceNotRecognized,

    #[error("Face recognition service unavailable, please try again")]
    RecognitionUnavailable,

    #[error("Too early to check in; earliest allowed at {}", earliest.format("%Y-%m-%d %H:%M"))]
    TooEarlyToCheckIn { earliest: DateTime<FixedOffset> },

    #[error("Outside the shift window, use overtime check-in instead")]
    OutsideShiftWindow,

    #[error("Attendance for this shift is already completed")]
    AlreadyCompleted,

    #[error("Overtime check-in not allowed: {0}")]
    OvertimeNotAllowedNow(OvertimeBlock),

    #[error("An overtime check-in is already open")]
    OvertimeAlreadyOpen,

    #[error("No open overtime check-in found")]
    OvertimeNotOpen,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("illegal status transition from {from} on {event}")]
    IllegalTransition { from: String, event: AttendanceEvent },

    #[error(transparent)]
    Storage(#[from] RepoError),
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        use AttendanceError::*;
        match self {
            NotFound { .. } => StatusCode::NOT_FOUND,
            InvalidTimezone(_) | ShiftNotConfigured | NoValidLocations | NoFaceReference => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            OnApprovedLeave(_)
            | TooEarlyToCheckIn { .. }
            | OutsideShiftWindow
            | OvertimeNotAllowedNow(_)
            | OvertimeNotOpen
            | Validation(_) => StatusCode::BAD_REQUEST,
            OutsideGeofence | FaceNotRecognized | Forbidden => StatusCode::FORBIDDEN,
            RecognitionUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AlreadyCompleted | OvertimeAlreadyOpen | Storage(RepoError::Conflict) => {
                StatusCode::CONFLICT
            }
            IllegalTransition { .. } | Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
            "Something went wrong, Contact with system admin".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(json!({ "message": message }))
    }
}
