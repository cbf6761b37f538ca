//! Historical record database operations.

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::appointments::{decode_date, decode_payment_mode};
use super::{Database, DbError, DbResult};
use crate::models::{
    format_timestamp, now_timestamp, HistoricalFields, HistoricalRecord, HistoricalUpsert,
};

const SELECT_HISTORICAL: &str = r#"
    SELECT record_id, registration_number, appointment_dates, patient_name,
           patient_problem, doctor_attended, treatment_done, package_purchased,
           payment_received, remaining_sessions, payment, payment_mode, remarks,
           created_at, updated_at
    FROM historical_records
"#;

impl Database {
    /// Find the historical record for a registration number.
    pub fn find_historical(&self, registration_number: &str) -> DbResult<Option<HistoricalRecord>> {
        let sql = format!("{} WHERE registration_number = ?", SELECT_HISTORICAL);
        self.conn
            .query_row(&sql, [registration_number], read_row)
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Insert or overwrite the historical record for a registration number.
    ///
    /// An existing record keeps its ID and creation time; every mapped field
    /// is replaced.
    pub fn upsert_historical(&self, fields: &HistoricalFields) -> DbResult<HistoricalUpsert> {
        if fields.registration_number.trim().is_empty() {
            return Err(DbError::Constraint(
                "Historical record requires a registration number".into(),
            ));
        }

        let tx = self.conn.unchecked_transaction()?;
        let existing = self.find_historical(&fields.registration_number)?;
        let now = now_timestamp();

        let (record_id, created) = match existing {
            Some(record) => {
                tx.execute(
                    r#"
                    UPDATE historical_records SET
                        appointment_dates = ?2,
                        patient_name = ?3,
                        patient_problem = ?4,
                        doctor_attended = ?5,
                        treatment_done = ?6,
                        package_purchased = ?7,
                        payment_received = ?8,
                        remaining_sessions = ?9,
                        payment = ?10,
                        payment_mode = ?11,
                        remarks = ?12,
                        updated_at = ?13
                    WHERE record_id = ?1
                    "#,
                    params![
                        record.record_id,
                        fields.appointment_dates.as_ref().map(format_timestamp),
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
                        now,
                    ],
                )?;
                (record.record_id, false)
            }
            None => {
                let record_id = uuid::Uuid::new_v4().to_string();
                tx.execute(
                    r#"
                    INSERT INTO historical_records (
                        record_id, registration_number, appointment_dates, patient_name,
                        patient_problem, doctor_attended, treatment_done, package_purchased,
                        payment_received, remaining_sessions, payment, payment_mode, remarks,
                        created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
                    "#,
                    params![
                        record_id,
                        fields.registration_number,
                        fields.appointment_dates.as_ref().map(format_timestamp),
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
                        now,
                    ],
                )?;
                (record_id, true)
            }
        };
        tx.commit()?;

        debug!(
            registration_number = %fields.registration_number,
            created,
            "upserted historical record"
        );

        let record = self
            .find_historical(&fields.registration_number)?
            .filter(|r| r.record_id == record_id)
            .ok_or_else(|| DbError::NotFound(record_id.clone()))?;
        Ok(HistoricalUpsert { record, created })
    }

    /// List all historical records, ordered by registration number.
    pub fn list_historical(&self) -> DbResult<Vec<HistoricalRecord>> {
        let sql = format!("{} ORDER BY registration_number", SELECT_HISTORICAL);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], read_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.try_into()?);
        }
        Ok(records)
    }
}

/// Intermediate row struct for database mapping.
struct HistoricalRow {
    record_id: String,
    registration_number: String,
    appointment_dates: Option<String>,
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

fn read_row(row: &Row<'_>) -> rusqlite::Result<HistoricalRow> {
    Ok(HistoricalRow {
        record_id: row.get(0)?,
        registration_number: row.get(1)?,
        appointment_dates: row.get(2)?,
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

impl TryFrom<HistoricalRow> for HistoricalRecord {
    type Error = DbError;

    fn try_from(row: HistoricalRow) -> Result<Self, Self::Error> {
        Ok(HistoricalRecord {
            record_id: row.record_id,
            fields: HistoricalFields {
                registration_number: row.registration_number,
                appointment_dates: decode_date(row.appointment_dates)?,
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
