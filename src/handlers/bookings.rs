//! Customer booking flow over HTTP. Sessions live in memory between calls.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{BookingDetails, BookingSession, SessionView};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SlotRequest {
    pub date: NaiveDate,
    pub hour: u32,
}

#[derive(Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

fn take_session(state: &AppState, id: Uuid) -> Result<BookingSession, AppError> {
    state.sessions.prune(Utc::now());
    state
        .sessions
        .take(id)
        .ok_or_else(|| AppError::NotFound(format!("booking session {id}")))
}

// POST /api/bookings
pub async fn start_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SlotRequest>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let now = Utc::now();
    state.sessions.prune(now);

    let session = state.booking.begin_selection(req.date, req.hour, now)?;
    let view = session.view();
    state.sessions.put(session);
    Ok((StatusCode::CREATED, Json(view)))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = take_session(&state, id)?;
    let view = session.view();
    state.sessions.put(session);
    Ok(Json(view))
}

// PUT /api/bookings/:id/slot
pub async fn change_slot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SlotRequest>,
) -> Result<Json<SessionView>, AppError> {
    let mut session = take_session(&state, id)?;
    let result = state
        .booking
        .select_slot(&mut session, req.date, req.hour, Utc::now());
    let view = session.view();
    state.sessions.put(session);
    result?;
    Ok(Json(view))
}

// POST /api/bookings/:id/details
pub async fn submit_details(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(details): Json<BookingDetails>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut session = take_session(&state, id)?;
    let result = state
        .booking
        .submit_details(&mut session, &details, Utc::now())
        .await;
    let view = session.view();
    state.sessions.put(session);

    let receipt = result?;
    Ok(Json(serde_json::json!({ "session": view, "receipt": receipt })))
}

// POST /api/bookings/:id/code
pub async fn submit_code(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CodeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut session = take_session(&state, id)?;
    let result = state
        .booking
        .submit_code(&mut session, &req.code, Utc::now())
        .await;
    let view = session.view();
    state.sessions.put(session);

    let confirmation = result?;
    Ok(Json(serde_json::json!({
        "session": view,
        "appointment": confirmation.appointment,
        "warnings": confirmation.warnings,
    })))
}

// POST /api/bookings/:id/resend
pub async fn resend_code(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut session = take_session(&state, id)?;
    let result = state.booking.resend(&mut session, Utc::now()).await;
    let view = session.view();
    state.sessions.put(session);

    let receipt = result?;
    Ok(Json(serde_json::json!({ "session": view, "receipt": receipt })))
}

// DELETE /api/bookings/:id
pub async fn abandon_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id) {
        tracing::info!(session = %id, "booking abandoned");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("booking session {id}")))
    }
}
