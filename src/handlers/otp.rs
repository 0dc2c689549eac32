use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, BookingError, FieldError};
use crate::models::details::is_valid_email;
use crate::services::booking::IssuedCodeReceipt;
use crate::services::otp::{self, OtpSecret, STEP_SECONDS};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct IssueRequest {
    pub email: String,
    pub target_timestamp: DateTime<Utc>,
}

// POST /api/otp/issue
pub async fn issue_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IssueRequest>,
) -> Result<Json<IssuedCodeReceipt>, AppError> {
    let email = req.email.trim();
    if !is_valid_email(email) {
        return Err(BookingError::Validation(vec![FieldError::new(
            "email",
            "Email must be a valid email",
        )])
        .into());
    }

    let issued = state
        .booking
        .issue_code_for(email, req.target_timestamp, Utc::now())
        .await?;
    Ok(Json(issued))
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub secret: String,
    pub code: String,
    pub step_seconds: Option<u64>,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    valid: bool,
}

// POST /api/otp/verify
pub async fn verify_code(Json(req): Json<VerifyRequest>) -> Result<Json<VerifyResponse>, AppError> {
    let secret = OtpSecret::decode(&req.secret).map_err(AppError::BadRequest)?;
    let step_seconds = req.step_seconds.unwrap_or(STEP_SECONDS);

    let valid = otp::verify(&secret, &req.code, step_seconds, Utc::now());
    if !valid {
        tracing::info!("stateless code verification failed");
    }
    Ok(Json(VerifyResponse { valid }))
}
