//! Active appointment database operations.

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{Database, DbError, DbResult};
use crate::models::{
    format_timestamp, now_timestamp, parse_timestamp, ActiveQuery, AppointmentFields,
    AppointmentRecord, PaymentMode,
};

const SELECT_ACTIVE: &str = r#"
    SELECT record_id, registration_number, appointment_date, patient_name,
           patient_problem, doctor_attended, treatment_done, package_purchased,
           payment_received, remaining_sessions, payment, payment_mode, remarks,
           created_at, updated_at
    FROM active_appointments
"#;

impl Database {
    /// Insert a new active appointment.
    pub fn insert_active(&self, fields: &AppointmentFields) -> DbResult<AppointmentRecord> {
        let record = AppointmentRecord::new(fields.clone());
        self.conn.execute(
            r#"
            INSERT INTO active_appointments (
                record_id, registration_number, appointment_date, patient_name,
                patient_problem, doctor_attended, treatment_done, package_purchased,
                payment_received, remaining_sessions, payment, payment_mode, remarks,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                record.record_id,
                fields.registration_number,
                fields.appointment_date.as_ref().map(format_timestamp),
                fields.patient_name,
                fields.patient_problem,
                fields.doctor_attended,
                fields.treatment_done,
                fields.package_purchased,
                fields.payment_received,
                fields.remaining_sessions,
                fields.payment,
                fields.payment_mode.map(|m| m.as_str()),
                fields.remarks,
                record.created_at,
                record.updated_at,
            ],
        )?;
        debug!(record_id = %record.record_id, "inserted active appointment");
        Ok(record)
    }

    /// Overwrite all fields of an active appointment.
    pub fn update_active(
        &self,
        record_id: &str,
        fields: &AppointmentFields,
    ) -> DbResult<AppointmentRecord> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE active_appointments SET
                registration_number = ?2,
                appointment_date = ?3,
                patient_name = ?4,
                patient_problem = ?5,
                doctor_attended = ?6,
                treatment_done = ?7,
                package_purchased = ?8,
                payment_received = ?9,
                remaining_sessions = ?10,
                payment = ?11,
                payment_mode = ?12,
                remarks = ?13,
                updated_at = ?14
            WHERE record_id = ?1
            "#,
            params![
                record_id,
                fields.registration_number,
                fields.appointment_date.as_ref().map(format_timestamp),
                fields.patient_name,
                fields.patient_problem,
                fields.doctor_attended,
                fields.treatment_done,
                fields.package_purchased,
                fields.payment_received,
                fields.remaining_sessions,
                fields.payment,
                fields.payment_mode.map(|m| m.as_str()),
                fields.remarks,
                now_timestamp(),
            ],
        )?;

        if rows_affected == 0 {
            return Err(DbError::NotFound(record_id.to_string()));
        }
        debug!(record_id, "updated active appointment");

        self.get_active(record_id)?
            .ok_or_else(|| DbError::NotFound(record_id.to_string()))
    }

    /// Get an active appointment by ID.
    pub fn get_active(&self, record_id: &str) -> DbResult<Option<AppointmentRecord>> {
        let sql = format!("{} WHERE record_id = ?", SELECT_ACTIVE);
        self.conn
            .query_row(&sql, [record_id], read_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List active appointments matching a query.
    ///
    /// Registration number and date range are filtered in SQL; the name
    /// filter is applied afterwards so that case folding covers non-ASCII
    /// names. Results are ordered by appointment date, newest first, with
    /// undated records last.
    pub fn list_active(&self, query: &ActiveQuery) -> DbResult<Vec<AppointmentRecord>> {
        let (start, end) = match &query.appointment_range {
            Some((start, end)) => (Some(format_timestamp(start)), Some(format_timestamp(end))),
            None => (None, None),
        };

        let sql = format!(
            r#"{}
            WHERE (?1 IS NULL OR registration_number = ?1)
              AND (?2 IS NULL OR (appointment_date >= ?2 AND appointment_date <= ?3))
            ORDER BY appointment_date IS NULL, appointment_date DESC
            "#,
            SELECT_ACTIVE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![query.registration_number, start, end], read_row)?;

        let mut records = Vec::new();
        for row in rows {
            let record: AppointmentRecord = row?.try_into()?;
            if query.matches_name(&record.fields) {
                records.push(record);
            }
        }

        debug!(count = records.len(), "listed active appointments");
        Ok(records)
    }

    /// Delete an active appointment.
    pub fn delete_active(&self, record_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM active_appointments WHERE record_id = ?", [record_id])?;
        debug!(record_id, deleted = rows_affected > 0, "deleted active appointment");
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct AppointmentRow {
    record_id: String,
    registration_number: String,
    appointment_date: Option<String>,
    patient_name: String,
    patient_problem: Option<String>,
    doctor_attended: Option<String>,
    treatment_done: Option<String>,
    package_purchased: bool,
    payment_received: bool,
    remaining_sessions: u32,
    payment: Option<u32>,
    payment_mode: Option<String>,
    remarks: String,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        record_id: row.get(0)?,
        registration_number: row.get(1)?,
        appointment_date: row.get(2)?,
        patient_name: row.get(3)?,
        patient_problem: row.get(4)?,
        doctor_attended: row.get(5)?,
        treatment_done: row.get(6)?,
        package_purchased: row.get(7)?,
        payment_received: row.get(8)?,
        remaining_sessions: row.get(9)?,
        payment: row.get(10)?,
        payment_mode: row.get(11)?,
        remarks: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

impl TryFrom<AppointmentRow> for AppointmentRecord {
    type Error = DbError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(AppointmentRecord {
            record_id: row.record_id,
            fields: AppointmentFields {
                registration_number: row.registration_number,
                appointment_date: decode_date(row.appointment_date)?,
                patient_name: row.patient_name,
                patient_problem: row.patient_problem,
                doctor_attended: row.doctor_attended,
                treatment_done: row.treatment_done,
                package_purchased: row.package_purchased,
                payment_received: row.payment_received,
                remaining_sessions: row.remaining_sessions,
                payment: row.payment,
                payment_mode: decode_payment_mode(row.payment_mode)?,
                remarks: row.remarks,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(super) fn decode_date(
    raw: Option<String>,
) -> Result<Option<chrono::DateTime<chrono::Utc>>, DbError> {
    raw.map(|s| {
        parse_timestamp(&s).map_err(|e| DbError::Constraint(format!("Invalid date {}: {}", s, e)))
    })
    .transpose()
}

pub(super) fn decode_payment_mode(raw: Option<String>) -> Result<Option<PaymentMode>, DbError> {
    raw.map(|s| s.parse::<PaymentMode>().map_err(DbError::Constraint))
        .transpose()
}
