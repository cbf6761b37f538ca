//! Finalize intent database operations.

use rusqlite::params;
use tracing::debug;

use super::{Database, DbError, DbResult};
use crate::models::{now_timestamp, FinalizeIntent, FinalizePhase};

impl Database {
    /// Persist an intent. A previous intent for the same record is replaced
    /// and restarts at its new phase.
    pub fn save_finalize_intent(&self, intent: &FinalizeIntent) -> DbResult<()> {
        let payload_json = serde_json::to_string(&intent.payload)?;

        self.conn.execute(
            r#"
            INSERT INTO finalize_intents (
                record_id, registration_number, payload, payload_digest,
                phase, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(record_id) DO UPDATE SET
                registration_number = excluded.registration_number,
                payload = excluded.payload,
                payload_digest = excluded.payload_digest,
                phase = excluded.phase,
                updated_at = excluded.updated_at
            "#,
            params![
                intent.record_id,
                intent.registration_number,
                payload_json,
                intent.payload_digest,
                intent.phase.as_str(),
                intent.created_at,
                intent.updated_at,
            ],
        )?;
        debug!(record_id = %intent.record_id, phase = intent.phase.as_str(), "saved finalize intent");
        Ok(())
    }

    /// Move an intent to a new phase.
    pub fn advance_finalize_intent(&self, record_id: &str, phase: FinalizePhase) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE finalize_intents SET phase = ?2, updated_at = ?3 WHERE record_id = ?1",
            params![record_id, phase.as_str(), now_timestamp()],
        )?;
        Ok(rows_affected > 0)
    }

    /// Remove an intent.
    pub fn clear_finalize_intent(&self, record_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM finalize_intents WHERE record_id = ?", [record_id])?;
        Ok(rows_affected > 0)
    }

    /// List outstanding intents, oldest first.
    pub fn list_finalize_intents(&self) -> DbResult<Vec<FinalizeIntent>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT record_id, registration_number, payload, payload_digest,
                   phase, created_at, updated_at
            FROM finalize_intents
            ORDER BY created_at
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(IntentRow {
                record_id: row.get(0)?,
                registration_number: row.get(1)?,
                payload: row.get(2)?,
                payload_digest: row.get(3)?,
                phase: row.get(4)?,
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
            })
        })?;

        let mut intents = Vec::new();
        for row in rows {
            intents.push(row?.try_into()?);
        }
        Ok(intents)
    }
}

/// Intermediate row struct for database mapping.
struct IntentRow {
    record_id: String,
    registration_number: String,
    payload: String,
    payload_digest: String,
    phase: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<IntentRow> for FinalizeIntent {
    type Error = DbError;

    fn try_from(row: IntentRow) -> Result<Self, Self::Error> {
        Ok(FinalizeIntent {
            record_id: row.record_id,
            registration_number: row.registration_number,
            payload: serde_json::from_str(&row.payload)?,
            payload_digest: row.payload_digest,
            phase: row.phase.parse().map_err(DbError::Constraint)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
