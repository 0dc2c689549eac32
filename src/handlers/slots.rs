use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::services::conflict;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    date: NaiveDate,
    operating_day: bool,
    fully_booked: bool,
    todo_count: usize,
    /// Free hours, ignoring the clock.
    available_hours: Vec<u32>,
    /// Hours whose instant is held by a DONE or CANCELLED row. They stay
    /// unbookable, so they are never offered.
    blocked_hours: Vec<u32>,
    /// Free hours that have not started yet and are not blocked.
    offered_hours: Vec<u32>,
}

// GET /api/slots?date=YYYY-MM-DD
pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid date: {}", query.date)))?;

    let todo = state.booking.todo_appointments()?;
    let policy = state.booking.policy();

    Ok(Json(SlotsResponse {
        date,
        operating_day: policy.is_operating_day(date),
        fully_booked: policy.is_fully_booked(date, &todo),
        todo_count: conflict::daily_count(policy, date, &todo),
        available_hours: policy.available_hours(date, &todo),
        blocked_hours: state.booking.retired_hours(date)?,
        offered_hours: state.booking.offered_hours(date, Utc::now())?,
    }))
}
