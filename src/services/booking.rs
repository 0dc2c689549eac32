//! The booking state machine. Customer sessions move
//! `SELECTING_SLOT -> AWAITING_EMAIL_VERIFICATION -> CONFIRMED`, detouring
//! through `EXPIRED_RETRY` when a code runs out. Staff act on stored
//! appointments through [`BookingOrchestrator::transition_status`].
//!
//! Every method takes `now` explicitly so the flow can be driven with a
//! fixed clock.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::BookingError;
use crate::models::{
    Appointment, AppointmentStatus, BookingDetails, BookingSession, BookingState, NewAppointment,
    PendingCode,
};
use crate::services::conflict;
use crate::services::mail::DeliveryReceipt;
use crate::services::notifications::Notifier;
use crate::services::otp::{self, OtpSecret};
use crate::services::slot_policy::SlotPolicy;

#[derive(Debug, Serialize)]
pub struct BookingConfirmation {
    pub appointment: Appointment,
    /// Non-fatal problems, e.g. the confirmation email bounced.
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusChange {
    pub appointment: Appointment,
    pub warnings: Vec<String>,
}

/// Result of the stateless issue-code call: the caller keeps the secret.
#[derive(Debug, Serialize)]
pub struct IssuedCodeReceipt {
    pub secret: OtpSecret,
    pub receipt: DeliveryReceipt,
    pub step_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct Schedule {
    pub todo: Vec<Appointment>,
    pub done: Vec<Appointment>,
    pub cancelled: Vec<Appointment>,
}

#[derive(Clone)]
pub struct BookingOrchestrator {
    db: Arc<Mutex<Connection>>,
    notifier: Notifier,
    policy: SlotPolicy,
}

impl BookingOrchestrator {
    pub fn new(db: Arc<Mutex<Connection>>, notifier: Notifier, policy: SlotPolicy) -> Self {
        Self {
            db,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> &SlotPolicy {
        &self.policy
    }

    fn lock_db(&self) -> Result<MutexGuard<'_, Connection>, BookingError> {
        self.db
            .lock()
            .map_err(|_| BookingError::Persistence("database lock poisoned".to_string()))
    }

    // ── Reads ──

    pub fn list_appointments(
        &self,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, BookingError> {
        let conn = self.lock_db()?;
        queries::list_appointments(&conn, status).map_err(BookingError::persistence)
    }

    pub fn todo_appointments(&self) -> Result<Vec<Appointment>, BookingError> {
        self.list_appointments(Some(AppointmentStatus::Todo))
    }

    pub fn schedule(&self) -> Result<Schedule, BookingError> {
        Ok(Schedule {
            todo: self.list_appointments(Some(AppointmentStatus::Todo))?,
            done: self.list_appointments(Some(AppointmentStatus::Done))?,
            cancelled: self.list_appointments(Some(AppointmentStatus::Cancelled))?,
        })
    }

    /// Hours on `day` held forever by a DONE or CANCELLED row.
    pub fn retired_hours(&self, day: NaiveDate) -> Result<Vec<u32>, BookingError> {
        let all = self.list_appointments(None)?;
        Ok(conflict::retired_hours(&self.policy, day, &all))
    }

    /// Hours a customer can still pick on `day`.
    pub fn offered_hours(&self, day: NaiveDate, now: DateTime<Utc>) -> Result<Vec<u32>, BookingError> {
        let todo = self.todo_appointments()?;
        let retired = self.retired_hours(day)?;
        Ok(self
            .policy
            .offered_hours(day, &todo, now)
            .into_iter()
            .filter(|hour| !retired.contains(hour))
            .collect())
    }

    // ── Customer session ──

    pub fn begin_selection(
        &self,
        day: NaiveDate,
        hour: u32,
        now: DateTime<Utc>,
    ) -> Result<BookingSession, BookingError> {
        let mut session = BookingSession::new(now);
        self.select_slot(&mut session, day, hour, now)?;
        Ok(session)
    }

    /// Picks (or re-picks) the slot of a session that has not sent a code yet.
    pub fn select_slot(
        &self,
        session: &mut BookingSession,
        day: NaiveDate,
        hour: u32,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        if !matches!(session.state, BookingState::SelectingSlot) {
            return Err(BookingError::InvalidState(format!(
                "cannot choose a slot while {}",
                session.state.as_str()
            )));
        }
        let todo = self.todo_appointments()?;
        let slot = self.policy.check_selectable(day, hour, &todo, now)?;
        if self.retired_hours(day)?.contains(&hour) {
            return Err(BookingError::SlotTaken);
        }
        session.slot = Some(slot);
        session.last_activity = now;
        tracing::info!(session = %session.id, starts_at = %slot.starts_at, "slot selected");
        Ok(())
    }

    /// Validates the form, re-checks the slot, and emails a code. The session
    /// only advances once the email is out; any failure leaves it in
    /// `SELECTING_SLOT`.
    pub async fn submit_details(
        &self,
        session: &mut BookingSession,
        details: &BookingDetails,
        now: DateTime<Utc>,
    ) -> Result<DeliveryReceipt, BookingError> {
        if !matches!(session.state, BookingState::SelectingSlot) {
            return Err(BookingError::InvalidState(format!(
                "details were already submitted ({})",
                session.state.as_str()
            )));
        }
        let slot = session
            .slot
            .ok_or_else(|| BookingError::InvalidState("Please select a time slot first".to_string()))?;
        session.last_activity = now;

        let candidate = details
            .validate(slot.starts_at)
            .map_err(BookingError::Validation)?;

        if slot.starts_at < now {
            session.reset();
            return Err(BookingError::SlotUnavailable("Invalid Date!".to_string()));
        }
        {
            let conn = self.lock_db()?;
            if let Err(err) = conflict::ensure_slot_free(&conn, slot.starts_at) {
                if matches!(err, BookingError::SlotTaken) {
                    session.reset();
                }
                return Err(err);
            }
        }

        let (pending, receipt) = self.send_new_code(&candidate.customer.email, now).await?;
        tracing::info!(session = %session.id, email = %pending.email, "verification code sent");
        session.candidate = Some(candidate);
        session.state = BookingState::AwaitingEmailVerification(pending);
        Ok(receipt)
    }

    /// Checks the code and, if it matches, books the slot. A wrong code can
    /// be retried any number of times.
    pub async fn submit_code(
        &self,
        session: &mut BookingSession,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<BookingConfirmation, BookingError> {
        let pending = session.state.pending().cloned().ok_or_else(|| {
            BookingError::InvalidState(format!(
                "no code is outstanding ({})",
                session.state.as_str()
            ))
        })?;
        let candidate = session
            .candidate
            .clone()
            .ok_or_else(|| BookingError::InvalidState("no booking details on file".to_string()))?;
        session.last_activity = now;

        if !otp::verify(&pending.secret, code, pending.step_seconds, now) {
            if pending.has_elapsed(now) {
                tracing::info!(session = %session.id, "expired code submitted");
                session.state = BookingState::ExpiredRetry(pending);
                return Err(BookingError::CodeExpired);
            }
            tracing::info!(session = %session.id, "invalid code submitted");
            return Err(BookingError::CodeInvalid);
        }

        let appointment = match self.persist(&candidate, now) {
            Ok(appointment) => appointment,
            Err(BookingError::SlotTaken) => {
                tracing::info!(session = %session.id, "slot taken before confirmation");
                session.reset();
                return Err(BookingError::SlotTaken);
            }
            Err(err) => return Err(err),
        };

        session.candidate = None;
        session.state = BookingState::Confirmed {
            appointment_id: appointment.id,
        };
        tracing::info!(session = %session.id, appointment_id = appointment.id, "booking confirmed");

        let warnings = self.confirm_by_email(&appointment).await;
        Ok(BookingConfirmation {
            appointment,
            warnings,
        })
    }

    /// Sends a fresh code once the current one has run out.
    pub async fn resend(
        &self,
        session: &mut BookingSession,
        now: DateTime<Utc>,
    ) -> Result<DeliveryReceipt, BookingError> {
        let pending = session.state.pending().cloned().ok_or_else(|| {
            BookingError::InvalidState(format!(
                "there is no code to resend ({})",
                session.state.as_str()
            ))
        })?;
        if !pending.has_elapsed(now) {
            return Err(BookingError::InvalidState(
                "You can request a new code once the current one expires".to_string(),
            ));
        }
        session.last_activity = now;

        let (fresh, receipt) = self.send_new_code(&pending.email, now).await?;
        tracing::info!(session = %session.id, email = %fresh.email, "verification code resent");
        session.state = BookingState::AwaitingEmailVerification(fresh);
        Ok(receipt)
    }

    async fn send_new_code(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<(PendingCode, DeliveryReceipt), BookingError> {
        let issued = otp::issue(now).map_err(|e| BookingError::Delivery(e.to_string()))?;
        let receipt = self
            .notifier
            .send_code(email, &issued.code, issued.step_seconds)
            .await?;
        let pending = PendingCode {
            secret: issued.secret,
            step_seconds: issued.step_seconds,
            issued_at: issued.issued_at,
            email: email.to_string(),
        };
        Ok((pending, receipt))
    }

    // ── Stateless protocol ──

    /// Emails a code for `target` without keeping any state. Rejects before
    /// sending anything if the slot is already held.
    pub async fn issue_code_for(
        &self,
        email: &str,
        target: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<IssuedCodeReceipt, BookingError> {
        {
            let conn = self.lock_db()?;
            conflict::ensure_slot_free(&conn, target)?;
        }
        let (pending, receipt) = self.send_new_code(email, now).await?;
        Ok(IssuedCodeReceipt {
            secret: pending.secret,
            receipt,
            step_seconds: pending.step_seconds,
        })
    }

    /// Books directly, as the staff form and the stateless flow do. The
    /// datastore decides who wins a contested slot.
    pub async fn create_appointment(
        &self,
        candidate: &NewAppointment,
        now: DateTime<Utc>,
    ) -> Result<BookingConfirmation, BookingError> {
        if self.policy.slot_at(candidate.scheduled_at).is_none() {
            return Err(BookingError::SlotUnavailable(
                "Appointments start at 7:00, 9:00, 13:00 or 15:00, Monday to Saturday".to_string(),
            ));
        }
        let appointment = self.persist(candidate, now)?;
        let warnings = self.confirm_by_email(&appointment).await;
        Ok(BookingConfirmation {
            appointment,
            warnings,
        })
    }

    fn persist(&self, candidate: &NewAppointment, now: DateTime<Utc>) -> Result<Appointment, BookingError> {
        let conn = self.lock_db()?;
        match queries::create_appointment(&conn, candidate, &now) {
            Ok(Some(appointment)) => {
                tracing::info!(
                    appointment_id = appointment.id,
                    scheduled_at = %appointment.scheduled_at,
                    "appointment created"
                );
                Ok(appointment)
            }
            Ok(None) => Err(BookingError::SlotTaken),
            Err(e) => {
                tracing::error!(error = %e, "failed to create appointment");
                Err(BookingError::persistence(e))
            }
        }
    }

    async fn confirm_by_email(&self, appointment: &Appointment) -> Vec<String> {
        let item_name = self.item_name(appointment);
        match self
            .notifier
            .send_confirmation(appointment, item_name.as_deref())
            .await
        {
            Ok(_) => Vec::new(),
            Err(err) => vec![err.to_string()],
        }
    }

    // ── Staff transitions ──

    /// Moves a TODO appointment to DONE or CANCELLED. Cancelling emails the
    /// customer; a bounced email never undoes the change.
    pub async fn transition_status(
        &self,
        id: i64,
        to: AppointmentStatus,
    ) -> Result<StatusChange, BookingError> {
        let appointment = {
            let conn = self.lock_db()?;
            let current = queries::get_appointment(&conn, id)
                .map_err(BookingError::persistence)?
                .ok_or(BookingError::NotFound(id))?;
            if !current.status.can_transition_to(to) {
                return Err(BookingError::InvalidTransition {
                    from: current.status,
                    to,
                });
            }
            let changed = queries::update_appointment_status(&conn, id, current.status, to)
                .map_err(BookingError::persistence)?;
            if !changed {
                // Someone else moved it first.
                let latest = queries::get_appointment(&conn, id)
                    .map_err(BookingError::persistence)?
                    .ok_or(BookingError::NotFound(id))?;
                return Err(BookingError::InvalidTransition {
                    from: latest.status,
                    to,
                });
            }
            Appointment {
                status: to,
                ..current
            }
        };
        tracing::info!(appointment_id = id, status = %to, "appointment status changed");

        let mut warnings = Vec::new();
        if to == AppointmentStatus::Cancelled {
            let item_name = self.item_name(&appointment);
            if let Err(err) = self
                .notifier
                .send_cancellation(&appointment, item_name.as_deref())
                .await
            {
                warnings.push(err.to_string());
            }
        }
        Ok(StatusChange {
            appointment,
            warnings,
        })
    }

    /// Display name of the linked inventory item, looked up at send time.
    fn item_name(&self, appointment: &Appointment) -> Option<String> {
        let item_id = appointment.ac_unit?;
        let conn = match self.lock_db() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(item_id, error = %e, "item lookup skipped");
                return None;
            }
        };
        match queries::get_item_name(&conn, item_id) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(item_id, error = %e, "item lookup failed");
                None
            }
        }
    }
}
