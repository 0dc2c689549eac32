pub mod appointments;
pub mod bookings;
pub mod health;
pub mod otp;
pub mod slots;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::Router;

use crate::errors::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/slots", get(slots::get_slots))
        .route("/api/otp/issue", post(otp::issue_code))
        .route("/api/otp/verify", post(otp::verify_code))
        .route("/api/bookings", post(bookings::start_booking))
        .route(
            "/api/bookings/:id",
            get(bookings::get_booking).delete(bookings::abandon_booking),
        )
        .route("/api/bookings/:id/slot", put(bookings::change_slot))
        .route("/api/bookings/:id/details", post(bookings::submit_details))
        .route("/api/bookings/:id/code", post(bookings::submit_code))
        .route("/api/bookings/:id/resend", post(bookings::resend_code))
        .route(
            "/api/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route("/api/appointments/:id", put(appointments::update_status))
        .route("/api/schedule", get(appointments::get_schedule))
        .with_state(state)
}

/// Staff endpoints expect `Authorization: Bearer <ADMIN_TOKEN>`.
pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
