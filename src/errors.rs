use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::models::AppointmentStatus;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Every way a booking action can be turned down. The `Display` text is what
/// the customer sees.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Please correct the highlighted fields")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    SlotUnavailable(String),

    #[error("This time slot is already scheduled!")]
    SlotTaken,

    #[error("Invalid code! Please try again")]
    CodeInvalid,

    #[error("The code has expired, request a new one")]
    CodeExpired,

    #[error("We could not send an email to you: {0}")]
    Delivery(String),

    #[error("We could not prepare your email: {0}")]
    Template(#[from] askama::Error),

    #[error("An error has occurred while saving: {0}")]
    Persistence(String),

    #[error("Cannot change an appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("{0}")]
    InvalidState(String),

    #[error("Appointment {0} not found")]
    NotFound(i64),
}

impl BookingError {
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "VALIDATION_ERROR",
            BookingError::SlotUnavailable(_) => "SLOT_UNAVAILABLE",
            BookingError::SlotTaken => "SLOT_TAKEN",
            BookingError::CodeInvalid => "CODE_INVALID",
            BookingError::CodeExpired => "CODE_EXPIRED",
            BookingError::Delivery(_) | BookingError::Template(_) => "DELIVERY_FAILURE",
            BookingError::Persistence(_) => "PERSISTENCE_FAILURE",
            BookingError::InvalidTransition { .. } => "INVALID_TRANSITION",
            BookingError::InvalidState(_) => "INVALID_STATE",
            BookingError::NotFound(_) => "NOT_FOUND",
        }
    }

    pub(crate) fn persistence(err: impl std::fmt::Display) -> Self {
        BookingError::Persistence(err.to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            BookingError::Validation(_)
            | BookingError::SlotUnavailable(_)
            | BookingError::SlotTaken
            | BookingError::CodeInvalid => StatusCode::BAD_REQUEST,
            BookingError::CodeExpired => StatusCode::GONE,
            BookingError::Delivery(_) => StatusCode::BAD_GATEWAY,
            BookingError::Template(_) | BookingError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            BookingError::InvalidTransition { .. } | BookingError::InvalidState(_) => {
                StatusCode::CONFLICT
            }
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Booking(err) => {
                let mut body = serde_json::json!({
                    "error": err.kind(),
                    "message": err.to_string(),
                });
                if let BookingError::Validation(fields) = err {
                    body["fields"] = serde_json::json!(fields);
                }
                (err.status_code(), body)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "INTERNAL", "message": "An error has occurred!" }),
                )
            }
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "BAD_REQUEST", "message": msg }),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": "NOT_FOUND", "message": msg }),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": "UNAUTHORIZED", "message": "unauthorized" }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(BookingError::SlotTaken.kind(), "SLOT_TAKEN");
        assert_eq!(BookingError::CodeExpired.kind(), "CODE_EXPIRED");
        assert_eq!(BookingError::Validation(vec![]).kind(), "VALIDATION_ERROR");
        assert_eq!(BookingError::Delivery("x".into()).kind(), "DELIVERY_FAILURE");
    }

    #[test]
    fn test_status_codes() {
        let resp = AppError::from(BookingError::SlotTaken).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = AppError::from(BookingError::InvalidTransition {
            from: AppointmentStatus::Done,
            to: AppointmentStatus::Cancelled,
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_transition_message() {
        let err = BookingError::InvalidTransition {
            from: AppointmentStatus::Done,
            to: AppointmentStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "Cannot change an appointment from DONE to CANCELLED");
    }
}
