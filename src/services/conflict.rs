use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::BookingError;
use crate::models::{Appointment, AppointmentStatus};
use crate::services::slot_policy::SlotPolicy;

fn open(todo: &[Appointment]) -> impl Iterator<Item = &Appointment> {
    todo.iter().filter(|a| a.status == AppointmentStatus::Todo)
}

/// Exact-instant match against open appointments. The same hour on another
/// day, or another minute of the same hour, is not a conflict.
pub fn is_date_taken(candidate: DateTime<Utc>, todo: &[Appointment]) -> bool {
    open(todo).any(|a| a.scheduled_at == candidate)
}

/// Open appointments falling on `day` in the business timezone.
pub fn daily_count(policy: &SlotPolicy, day: NaiveDate, todo: &[Appointment]) -> usize {
    open(todo)
        .filter(|a| policy.local_date(a.scheduled_at) == day)
        .count()
}

/// Local start hours already held on `day`, ascending and deduplicated.
pub fn taken_hours(policy: &SlotPolicy, day: NaiveDate, todo: &[Appointment]) -> Vec<u32> {
    let mut hours: Vec<u32> = open(todo)
        .filter(|a| policy.local_date(a.scheduled_at) == day)
        .map(|a| policy.local_hour(a.scheduled_at))
        .collect();
    hours.sort_unstable();
    hours.dedup();
    hours
}

/// Local start hours on `day` whose instant belongs to a DONE or CANCELLED
/// row. Those instants can never be booked again.
pub fn retired_hours(policy: &SlotPolicy, day: NaiveDate, appointments: &[Appointment]) -> Vec<u32> {
    let mut hours: Vec<u32> = appointments
        .iter()
        .filter(|a| a.status != AppointmentStatus::Todo)
        .filter(|a| policy.local_date(a.scheduled_at) == day)
        .map(|a| policy.local_hour(a.scheduled_at))
        .collect();
    hours.sort_unstable();
    hours.dedup();
    hours
}

/// Authoritative check against the datastore: any stored row at exactly this
/// instant, whatever its status, holds the slot.
pub fn ensure_slot_free(conn: &Connection, at: DateTime<Utc>) -> Result<(), BookingError> {
    let existing = queries::count_appointments_at(conn, &at).map_err(BookingError::persistence)?;
    if existing > 0 {
        tracing::info!(scheduled_at = %at, "slot already taken");
        return Err(BookingError::SlotTaken);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{AcType, Customer, NewAppointment, ServiceKind};
    use chrono::{Duration, TimeZone};

    fn policy() -> SlotPolicy {
        SlotPolicy::new(chrono_tz::Asia::Manila)
    }

    fn new_appt(at: DateTime<Utc>) -> NewAppointment {
        NewAppointment {
            customer: Customer {
                name: "Ben".to_string(),
                email: "ben@example.com".to_string(),
                contact_no: "9181234567".to_string(),
            },
            address: "Quezon City".to_string(),
            ac_type: AcType::Window,
            ac_unit: None,
            service: ServiceKind::Repair,
            quantity: 2,
            scheduled_at: at,
        }
    }

    fn appt(at: DateTime<Utc>, status: AppointmentStatus) -> Appointment {
        let n = new_appt(at);
        Appointment {
            id: 7,
            customer: n.customer,
            address: n.address,
            ac_type: n.ac_type,
            ac_unit: n.ac_unit,
            service: n.service,
            quantity: n.quantity,
            scheduled_at: at,
            status,
            created_at: at,
        }
    }

    fn nine_am_monday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 16, 1, 0, 0).unwrap()
    }

    #[test]
    fn test_is_date_taken_exact_instant() {
        let todo = vec![appt(nine_am_monday(), AppointmentStatus::Todo)];
        assert!(is_date_taken(nine_am_monday(), &todo));
        assert!(!is_date_taken(nine_am_monday() + Duration::minutes(1), &todo));
        assert!(!is_date_taken(nine_am_monday() + Duration::days(1), &todo));
    }

    #[test]
    fn test_is_date_taken_stable_across_reencoding() {
        let todo = vec![appt(nine_am_monday(), AppointmentStatus::Todo)];
        let encoded = nine_am_monday().to_rfc3339();
        let decoded = DateTime::parse_from_rfc3339(&encoded).unwrap().with_timezone(&Utc);
        assert_eq!(is_date_taken(decoded, &todo), is_date_taken(nine_am_monday(), &todo));

        let manila = nine_am_monday().with_timezone(&chrono_tz::Asia::Manila).to_rfc3339();
        let decoded = DateTime::parse_from_rfc3339(&manila).unwrap().with_timezone(&Utc);
        assert!(is_date_taken(decoded, &todo));
    }

    #[test]
    fn test_retired_hours_only_count_closed_rows() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        let rows = vec![
            appt(nine_am_monday(), AppointmentStatus::Cancelled),
            appt(nine_am_monday() + Duration::hours(4), AppointmentStatus::Done),
            appt(nine_am_monday() + Duration::hours(6), AppointmentStatus::Todo),
            appt(nine_am_monday() + Duration::days(1), AppointmentStatus::Cancelled),
        ];
        assert_eq!(retired_hours(&policy(), day, &rows), vec![9, 13]);
    }

    #[test]
    fn test_cancelled_is_not_taken_for_display() {
        let todo = vec![appt(nine_am_monday(), AppointmentStatus::Cancelled)];
        assert!(!is_date_taken(nine_am_monday(), &todo));
    }

    #[test]
    fn test_daily_count_uses_business_day() {
        let p = policy();
        let monday = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        // 23:30 UTC Sunday is 07:30 Monday in Manila.
        let late_sunday_utc = Utc.with_ymd_and_hms(2025, 6, 15, 23, 30, 0).unwrap();
        let todo = vec![
            appt(nine_am_monday(), AppointmentStatus::Todo),
            appt(late_sunday_utc, AppointmentStatus::Todo),
            appt(nine_am_monday() + Duration::hours(4), AppointmentStatus::Done),
        ];
        assert_eq!(daily_count(&p, monday, &todo), 2);
        assert_eq!(taken_hours(&p, monday, &todo), vec![7, 9]);
    }

    #[test]
    fn test_ensure_slot_free_counts_any_status() {
        let conn = db::init_db(":memory:").unwrap();
        assert!(ensure_slot_free(&conn, nine_am_monday()).is_ok());

        let created = queries::create_appointment(&conn, &new_appt(nine_am_monday()), &nine_am_monday())
            .unwrap()
            .unwrap();
        assert!(matches!(ensure_slot_free(&conn, nine_am_monday()), Err(BookingError::SlotTaken)));

        queries::update_appointment_status(
            &conn,
            created.id,
            AppointmentStatus::Todo,
            AppointmentStatus::Cancelled,
        )
        .unwrap();
        assert!(matches!(ensure_slot_free(&conn, nine_am_monday()), Err(BookingError::SlotTaken)));
    }
}
