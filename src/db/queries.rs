use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::models::{
    AcType, Appointment, AppointmentStatus, Customer, NewAppointment, ServiceKind,
};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const APPOINTMENT_COLUMNS: &str = "id, customer_name, customer_email, customer_contact, address, \
     ac_type, ac_unit, service, quantity, scheduled_at, status, created_at";

fn format_ts(at: &DateTime<Utc>) -> String {
    at.format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .with_context(|| format!("invalid stored timestamp: {s}"))?;
    Ok(naive.and_utc())
}

// ── Appointments ──

/// Inserts unless a row already holds `scheduled_at`. Returns `None` when the
/// slot is occupied, including when a concurrent writer wins the unique index.
pub fn create_appointment(
    conn: &Connection,
    appt: &NewAppointment,
    created_at: &DateTime<Utc>,
) -> anyhow::Result<Option<Appointment>> {
    let scheduled_at = format_ts(&appt.scheduled_at);
    let created_at_str = format_ts(created_at);

    let tx = conn.unchecked_transaction()?;

    let existing: i64 = tx.query_row(
        "SELECT COUNT(*) FROM appointments WHERE scheduled_at = ?1",
        params![scheduled_at],
        |row| row.get(0),
    )?;
    if existing > 0 {
        return Ok(None);
    }

    let inserted = tx.execute(
        "INSERT INTO appointments (customer_name, customer_email, customer_contact, address, ac_type, ac_unit, service, quantity, scheduled_at, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            appt.customer.name,
            appt.customer.email,
            appt.customer.contact_no,
            appt.address,
            appt.ac_type.as_str(),
            appt.ac_unit,
            appt.service.as_str(),
            appt.quantity,
            scheduled_at,
            AppointmentStatus::Todo.as_str(),
            created_at_str,
        ],
    );

    match inserted {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    let id = tx.last_insert_rowid();
    tx.commit()?;

    Ok(Some(Appointment {
        id,
        customer: appt.customer.clone(),
        address: appt.address.clone(),
        ac_type: appt.ac_type,
        ac_unit: appt.ac_unit,
        service: appt.service,
        quantity: appt.quantity,
        scheduled_at: appt.scheduled_at,
        status: AppointmentStatus::Todo,
        created_at: parse_ts(&created_at_str)?,
    }))
}

pub fn count_appointments_at(conn: &Connection, at: &DateTime<Utc>) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE scheduled_at = ?1",
        params![format_ts(at)],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn list_appointments(
    conn: &Connection,
    status_filter: Option<AppointmentStatus>,
) -> anyhow::Result<Vec<Appointment>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE status = ?1 ORDER BY scheduled_at ASC"),
            vec![Box::new(status.as_str()) as Box<dyn rusqlite::types::ToSql>],
        ),
        None => (
            format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments ORDER BY scheduled_at ASC"),
            vec![],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_appointment_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub fn get_appointment(conn: &Connection, id: i64) -> anyhow::Result<Option<Appointment>> {
    let result = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id],
            |row| Ok(parse_appointment_row(row)),
        )
        .optional()?;

    result.transpose()
}

/// Compare-and-set on status: only updates while the row is still `from`.
/// Returns whether a row changed.
pub fn update_appointment_status(
    conn: &Connection,
    id: i64,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![to.as_str(), id, from.as_str()],
    )?;
    Ok(count > 0)
}

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let ac_type_str: String = row.get(5)?;
    let service_str: String = row.get(7)?;
    let quantity: i64 = row.get(8)?;
    let scheduled_at_str: String = row.get(9)?;
    let status_str: String = row.get(10)?;
    let created_at_str: String = row.get(11)?;

    Ok(Appointment {
        id: row.get(0)?,
        customer: Customer {
            name: row.get(1)?,
            email: row.get(2)?,
            contact_no: row.get(3)?,
        },
        address: row.get(4)?,
        ac_type: AcType::parse(&ac_type_str)
            .with_context(|| format!("unknown ac_type: {ac_type_str}"))?,
        ac_unit: row.get(6)?,
        service: ServiceKind::parse(&service_str)
            .with_context(|| format!("unknown service: {service_str}"))?,
        quantity: u8::try_from(quantity).with_context(|| format!("invalid quantity: {quantity}"))?,
        scheduled_at: parse_ts(&scheduled_at_str)?,
        status: AppointmentStatus::parse(&status_str)
            .with_context(|| format!("unknown status: {status_str}"))?,
        created_at: parse_ts(&created_at_str)?,
    })
}

// ── Items ──

pub fn get_item_name(conn: &Connection, item_id: i64) -> anyhow::Result<Option<String>> {
    let name = conn
        .query_row(
            "SELECT name FROM items WHERE id = ?1",
            params![item_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(name)
}

pub fn create_item(conn: &Connection, name: &str) -> anyhow::Result<i64> {
    conn.execute("INSERT INTO items (name) VALUES (?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::{Duration, TimeZone};

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 16, hour, 0, 0).unwrap()
    }

    fn new_appt(scheduled_at: DateTime<Utc>) -> NewAppointment {
        NewAppointment {
            customer: Customer {
                name: "Carla".to_string(),
                email: "carla@example.com".to_string(),
                contact_no: "9191234567".to_string(),
            },
            address: "Makati".to_string(),
            ac_type: AcType::Split,
            ac_unit: None,
            service: ServiceKind::Cleaning,
            quantity: 1,
            scheduled_at,
        }
    }

    #[test]
    fn test_create_and_get() {
        let conn = setup_db();
        let created = create_appointment(&conn, &new_appt(at(1)), &at(0)).unwrap().unwrap();
        assert_eq!(created.status, AppointmentStatus::Todo);

        let loaded = get_appointment(&conn, created.id).unwrap().unwrap();
        assert_eq!(loaded, created);
        assert!(get_appointment(&conn, created.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_create_rejects_duplicate_instant() {
        let conn = setup_db();
        assert!(create_appointment(&conn, &new_appt(at(1)), &at(0)).unwrap().is_some());
        assert!(create_appointment(&conn, &new_appt(at(1)), &at(0)).unwrap().is_none());
        assert!(create_appointment(&conn, &new_appt(at(5)), &at(0)).unwrap().is_some());
        assert_eq!(count_appointments_at(&conn, &at(1)).unwrap(), 1);
    }

    #[test]
    fn test_unique_index_is_the_last_line() {
        let conn = setup_db();
        create_appointment(&conn, &new_appt(at(1)), &at(0)).unwrap();
        let err = conn.execute(
            "INSERT INTO appointments (customer_name, customer_email, customer_contact, address, ac_type, service, quantity, scheduled_at, created_at)
             VALUES ('x', 'x@y.z', '0000000000', 'a', 'SPLIT', 'REPAIR', 1, ?1, ?1)",
            params![format_ts(&at(1))],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_list_by_status_ordered() {
        let conn = setup_db();
        let late = create_appointment(&conn, &new_appt(at(7)), &at(0)).unwrap().unwrap();
        let early = create_appointment(&conn, &new_appt(at(1)), &at(0)).unwrap().unwrap();
        let done = create_appointment(&conn, &new_appt(at(5)), &at(0)).unwrap().unwrap();
        update_appointment_status(&conn, done.id, AppointmentStatus::Todo, AppointmentStatus::Done).unwrap();

        let todo = list_appointments(&conn, Some(AppointmentStatus::Todo)).unwrap();
        assert_eq!(todo.iter().map(|a| a.id).collect::<Vec<_>>(), vec![early.id, late.id]);

        let finished = list_appointments(&conn, Some(AppointmentStatus::Done)).unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].status, AppointmentStatus::Done);

        assert_eq!(list_appointments(&conn, None).unwrap().len(), 3);
    }

    #[test]
    fn test_status_update_is_compare_and_set() {
        let conn = setup_db();
        let created = create_appointment(&conn, &new_appt(at(1)), &at(0)).unwrap().unwrap();
        assert!(update_appointment_status(&conn, created.id, AppointmentStatus::Todo, AppointmentStatus::Done).unwrap());
        assert!(!update_appointment_status(&conn, created.id, AppointmentStatus::Todo, AppointmentStatus::Cancelled).unwrap());
        let loaded = get_appointment(&conn, created.id).unwrap().unwrap();
        assert_eq!(loaded.status, AppointmentStatus::Done);
    }

    #[test]
    fn test_item_names() {
        let conn = setup_db();
        let id = create_item(&conn, "Carrier 1.5HP Inverter").unwrap();
        assert_eq!(get_item_name(&conn, id).unwrap().as_deref(), Some("Carrier 1.5HP Inverter"));
        assert_eq!(get_item_name(&conn, id + 1).unwrap(), None);
    }

    #[test]
    fn test_timestamps_round_trip_to_the_second() {
        let conn = setup_db();
        let when = at(1) + Duration::days(3);
        let created = create_appointment(&conn, &new_appt(when), &at(0)).unwrap().unwrap();
        let loaded = get_appointment(&conn, created.id).unwrap().unwrap();
        assert_eq!(loaded.scheduled_at, when);
    }
}
