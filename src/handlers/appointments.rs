use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::check_auth;
use crate::errors::{AppError, BookingError};
use crate::models::{Appointment, AppointmentStatus, BookingDetails};
use crate::services::booking::{BookingConfirmation, Schedule, StatusChange};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

fn parse_status(raw: &str) -> Result<AppointmentStatus, AppError> {
    AppointmentStatus::parse(raw)
        .ok_or_else(|| AppError::BadRequest(format!("unknown status: {raw}")))
}

// GET /api/appointments?status=TODO
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = query.status.as_deref().map(parse_status).transpose()?;
    Ok(Json(state.booking.list_appointments(status)?))
}

// GET /api/schedule
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Schedule>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    Ok(Json(state.booking.schedule()?))
}

#[derive(Deserialize)]
pub struct CreateAppointmentRequest {
    pub scheduled_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: BookingDetails,
}

#[derive(Serialize)]
pub struct CreateAppointmentResponse {
    success: bool,
    #[serde(flatten)]
    confirmation: BookingConfirmation,
}

// POST /api/appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<CreateAppointmentResponse>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let candidate = req
        .details
        .validate(req.scheduled_at)
        .map_err(BookingError::Validation)?;
    let confirmation = state
        .booking
        .create_appointment(&candidate, Utc::now())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateAppointmentResponse {
            success: true,
            confirmation,
        }),
    ))
}

#[derive(Serialize)]
pub struct UpdateStatusResponse {
    success: bool,
    #[serde(flatten)]
    change: StatusChange,
}

// PUT /api/appointments/:id?status=DONE
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<UpdateStatusResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let raw = query
        .status
        .ok_or_else(|| AppError::BadRequest("status is required".to_string()))?;
    let to = parse_status(&raw)?;

    let change = state.booking.transition_status(id, to).await?;
    Ok(Json(UpdateStatusResponse {
        success: true,
        change,
    }))
}
