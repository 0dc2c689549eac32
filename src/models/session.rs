use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::NewAppointment;
use crate::services::otp::OtpSecret;
use crate::services::slot_policy::Slot;

/// The code currently outstanding for a session. Only the secret is kept;
/// the code itself lives in the customer's inbox.
#[derive(Debug, Clone)]
pub struct PendingCode {
    pub secret: OtpSecret,
    pub step_seconds: u64,
    pub issued_at: DateTime<Utc>,
    pub email: String,
}

impl PendingCode {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(self.step_seconds as i64)
    }

    pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

#[derive(Debug, Clone)]
pub enum BookingState {
    SelectingSlot,
    AwaitingEmailVerification(PendingCode),
    /// A code was rejected after its window ran out; only a resend moves on.
    ExpiredRetry(PendingCode),
    Confirmed { appointment_id: i64 },
}

impl BookingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingState::SelectingSlot => "SELECTING_SLOT",
            BookingState::AwaitingEmailVerification(_) => "AWAITING_EMAIL_VERIFICATION",
            BookingState::ExpiredRetry(_) => "EXPIRED_RETRY",
            BookingState::Confirmed { .. } => "CONFIRMED",
        }
    }

    pub fn pending(&self) -> Option<&PendingCode> {
        match self {
            BookingState::AwaitingEmailVerification(pending) | BookingState::ExpiredRetry(pending) => {
                Some(pending)
            }
            _ => None,
        }
    }
}

/// One customer's in-flight booking. Never written to the database; it is
/// dropped on confirmation or abandonment.
#[derive(Debug, Clone)]
pub struct BookingSession {
    pub id: Uuid,
    pub slot: Option<Slot>,
    pub candidate: Option<NewAppointment>,
    pub state: BookingState,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl BookingSession {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            slot: None,
            candidate: None,
            state: BookingState::SelectingSlot,
            created_at: now,
            last_activity: now,
        }
    }

    /// Back to slot selection with nothing held.
    pub fn reset(&mut self) {
        self.slot = None;
        self.candidate = None;
        self.state = BookingState::SelectingSlot;
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id,
            state: self.state.as_str(),
            slot: self.slot,
            code_expires_at: self.state.pending().map(PendingCode::expires_at),
            appointment_id: match self.state {
                BookingState::Confirmed { appointment_id } => Some(appointment_id),
                _ => None,
            },
        }
    }
}

/// What the client may see of a session. The secret never leaves the server.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub state: &'static str,
    pub slot: Option<Slot>,
    pub code_expires_at: Option<DateTime<Utc>>,
    pub appointment_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pending(issued_at: DateTime<Utc>) -> PendingCode {
        PendingCode {
            secret: OtpSecret::from_bytes(b"12345678901234567890".to_vec()),
            step_seconds: 300,
            issued_at,
            email: "ana@example.com".to_string(),
        }
    }

    #[test]
    fn test_pending_code_expiry() {
        let issued = Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap();
        let code = pending(issued);
        assert_eq!(code.expires_at(), issued + Duration::seconds(300));
        assert!(!code.has_elapsed(issued + Duration::seconds(299)));
        assert!(code.has_elapsed(issued + Duration::seconds(300)));
    }

    #[test]
    fn test_view_hides_secret() {
        let now = Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap();
        let mut session = BookingSession::new(now);
        session.state = BookingState::AwaitingEmailVerification(pending(now));

        let json = serde_json::to_value(session.view()).unwrap();
        assert_eq!(json["state"], "AWAITING_EMAIL_VERIFICATION");
        assert!(json["code_expires_at"].is_string());
        assert!(!json.to_string().contains("secret"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let now = Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap();
        let mut session = BookingSession::new(now);
        session.state = BookingState::ExpiredRetry(pending(now));
        session.reset();
        assert_eq!(session.state.as_str(), "SELECTING_SLOT");
        assert!(session.slot.is_none());
        assert!(session.candidate.is_none());
    }
}
