use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use crate::errors::BookingError;
use crate::models::Appointment;
use crate::services::conflict;

/// Start hours offered on every operating day, in business-local time.
pub const SLOT_HOURS: [u32; 4] = [7, 9, 13, 15];

/// A bookable (day, hour) pair resolved to its instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub hour: u32,
    pub starts_at: DateTime<Utc>,
}

/// Which slots exist at all. Everything here is a pure function of its
/// arguments; the business timezone is the only configuration.
#[derive(Debug, Clone, Copy)]
pub struct SlotPolicy {
    tz: Tz,
}

impl SlotPolicy {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Monday through Saturday.
    pub fn is_operating_day(&self, day: NaiveDate) -> bool {
        day.weekday() != Weekday::Sun
    }

    pub fn is_slot_hour(hour: u32) -> bool {
        SLOT_HOURS.contains(&hour)
    }

    /// Resolves a slot on an operating day. Returns `None` for closed days and
    /// hours outside [`SLOT_HOURS`].
    pub fn slot(&self, day: NaiveDate, hour: u32) -> Option<Slot> {
        if !self.is_operating_day(day) || !Self::is_slot_hour(hour) {
            return None;
        }
        let local = day.and_hms_opt(hour, 0, 0)?;
        let starts_at = self.tz.from_local_datetime(&local).earliest()?;
        Some(Slot {
            date: day,
            hour,
            starts_at: starts_at.with_timezone(&Utc),
        })
    }

    /// Inverse of [`SlotPolicy::slot`]: the slot that starts exactly at `at`, if any.
    pub fn slot_at(&self, at: DateTime<Utc>) -> Option<Slot> {
        let local = at.with_timezone(&self.tz);
        if local.minute() != 0 || local.second() != 0 || local.nanosecond() != 0 {
            return None;
        }
        self.slot(local.date_naive(), local.hour())
            .filter(|slot| slot.starts_at == at)
    }

    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.tz).date_naive()
    }

    pub fn local_hour(&self, at: DateTime<Utc>) -> u32 {
        at.with_timezone(&self.tz).hour()
    }

    /// Slot hours of `day` that no TODO appointment occupies, ascending.
    /// Closed days have none.
    pub fn available_hours(&self, day: NaiveDate, todo: &[Appointment]) -> Vec<u32> {
        if !self.is_operating_day(day) {
            return Vec::new();
        }
        let taken = conflict::taken_hours(self, day, todo);
        SLOT_HOURS
            .iter()
            .copied()
            .filter(|hour| !taken.contains(hour))
            .collect()
    }

    pub fn is_fully_booked(&self, day: NaiveDate, todo: &[Appointment]) -> bool {
        self.is_operating_day(day) && self.available_hours(day, todo).is_empty()
    }

    /// What a customer is actually offered: available hours whose start has
    /// not passed yet.
    pub fn offered_hours(&self, day: NaiveDate, todo: &[Appointment], now: DateTime<Utc>) -> Vec<u32> {
        self.available_hours(day, todo)
            .into_iter()
            .filter(|hour| {
                self.slot(day, *hour)
                    .map(|slot| slot.starts_at >= now)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Advisory check made when a customer picks a slot on the calendar.
    pub fn check_selectable(
        &self,
        day: NaiveDate,
        hour: u32,
        todo: &[Appointment],
        now: DateTime<Utc>,
    ) -> Result<Slot, BookingError> {
        if !self.is_operating_day(day) {
            return Err(BookingError::SlotUnavailable(
                "Our operating hours is from Monday to Saturday only!".to_string(),
            ));
        }
        let slot = self.slot(day, hour).ok_or_else(|| {
            BookingError::SlotUnavailable(format!(
                "{hour}:00 is not a bookable hour; choose 7:00, 9:00, 13:00 or 15:00"
            ))
        })?;
        if slot.starts_at < now {
            return Err(BookingError::SlotUnavailable("Invalid Date!".to_string()));
        }
        if self.is_fully_booked(day, todo) {
            return Err(BookingError::SlotUnavailable(
                "That day is fully booked!".to_string(),
            ));
        }
        if !self.available_hours(day, todo).contains(&hour) {
            return Err(BookingError::SlotTaken);
        }
        Ok(slot)
    }
}
