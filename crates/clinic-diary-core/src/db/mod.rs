//! Document store for the clinic diary.
//!
//! The dashboard talks to the store through [`AppointmentStore`]; [`Database`]
//! is the SQLite implementation with one table per collection.

mod schema;
mod appointments;
mod historical;
mod intents;

pub use schema::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::models::{
    ActiveQuery, AppointmentFields, AppointmentRecord, FinalizeIntent, FinalizePhase,
    HistoricalFields, HistoricalRecord, HistoricalUpsert,
};

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Operations the dashboard needs from the document store.
pub trait AppointmentStore {
    /// List active records matching the query, newest appointment first.
    fn list_active(&self, query: &ActiveQuery) -> DbResult<Vec<AppointmentRecord>>;

    /// Get an active record by ID.
    fn get_active(&self, record_id: &str) -> DbResult<Option<AppointmentRecord>>;

    /// Create an active record (booking flow).
    fn insert_active(&self, fields: &AppointmentFields) -> DbResult<AppointmentRecord>;

    /// Overwrite the fields of an active record and return the stored result.
    fn update_active(&self, record_id: &str, fields: &AppointmentFields)
        -> DbResult<AppointmentRecord>;

    /// Delete an active record. Returns false if it did not exist.
    fn delete_active(&self, record_id: &str) -> DbResult<bool>;

    /// Find the historical record for a registration number.
    fn find_historical(&self, registration_number: &str) -> DbResult<Option<HistoricalRecord>>;

    /// Insert or overwrite the historical record keyed by registration number.
    fn upsert_historical(&self, fields: &HistoricalFields) -> DbResult<HistoricalUpsert>;

    /// List all historical records.
    fn list_historical(&self) -> DbResult<Vec<HistoricalRecord>>;

    /// Persist a finalize intent, replacing any previous intent for the record.
    fn save_finalize_intent(&self, intent: &FinalizeIntent) -> DbResult<()>;

    /// Move an intent to a new phase. Returns false if no intent exists.
    fn advance_finalize_intent(&self, record_id: &str, phase: FinalizePhase) -> DbResult<bool>;

    /// Remove a completed intent. Returns false if no intent exists.
    fn clear_finalize_intent(&self, record_id: &str) -> DbResult<bool>;

    /// List every outstanding intent, oldest first.
    fn list_finalize_intents(&self) -> DbResult<Vec<FinalizeIntent>>;
}

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl AppointmentStore for Database {
    fn list_active(&self, query: &ActiveQuery) -> DbResult<Vec<AppointmentRecord>> {
        Database::list_active(self, query)
    }

    fn get_active(&self, record_id: &str) -> DbResult<Option<AppointmentRecord>> {
        Database::get_active(self, record_id)
    }

    fn insert_active(&self, fields: &AppointmentFields) -> DbResult<AppointmentRecord> {
        Database::insert_active(self, fields)
    }

    fn update_active(
        &self,
        record_id: &str,
        fields: &AppointmentFields,
    ) -> DbResult<AppointmentRecord> {
        Database::update_active(self, record_id, fields)
    }

    fn delete_active(&self, record_id: &str) -> DbResult<bool> {
        Database::delete_active(self, record_id)
    }

    fn find_historical(&self, registration_number: &str) -> DbResult<Option<HistoricalRecord>> {
        Database::find_historical(self, registration_number)
    }

    fn upsert_historical(&self, fields: &HistoricalFields) -> DbResult<HistoricalUpsert> {
        Database::upsert_historical(self, fields)
    }

    fn list_historical(&self) -> DbResult<Vec<HistoricalRecord>> {
        Database::list_historical(self)
    }

    fn save_finalize_intent(&self, intent: &FinalizeIntent) -> DbResult<()> {
        Database::save_finalize_intent(self, intent)
    }

    fn advance_finalize_intent(&self, record_id: &str, phase: FinalizePhase) -> DbResult<bool> {
        Database::advance_finalize_intent(self, record_id, phase)
    }

    fn clear_finalize_intent(&self, record_id: &str) -> DbResult<bool> {
        Database::clear_finalize_intent(self, record_id)
    }

    fn list_finalize_intents(&self) -> DbResult<Vec<FinalizeIntent>> {
        Database::list_finalize_intents(self)
    }
}
