//! Finalize: move an active appointment into the historical collection.
//!
//! ```text
//! Active ──validate──► Rejected
//!    │
//!    └─record intent─► Pending ──upsert historical──► HistoricalWritten
//!                                                          │
//!                                  Finalized ◄──delete active + clear intent
//! ```
//!
//! The intent is persisted before the first write, so a move interrupted
//! between the two writes is picked up again by [`Finalizer::resume_all`].
//! Both writes are idempotent: the historical upsert is keyed by registration
//! number and deleting an already-deleted active record counts as done.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{AppointmentStore, DbError};
use crate::models::{
    AppointmentFields, AppointmentRecord, FinalizeIntent, FinalizePhase, HistoricalFields,
    HistoricalUpsert, RecordField,
};

/// Fields that must be filled in before a record can be finalized.
pub const REQUIRED_FOR_FINALIZE: [RecordField; 5] = [
    RecordField::PatientProblem,
    RecordField::DoctorAttended,
    RecordField::TreatmentDone,
    RecordField::Payment,
    RecordField::PaymentMode,
];

/// Finalize errors.
#[derive(Error, Debug)]
pub enum FinalizeError {
    #[error("No loaded record with ID {0}")]
    NotFound(String),

    #[error("Could not encode historical payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Could not record finalize intent: {0}")]
    Intent(DbError),

    #[error("Could not write historical record: {0}")]
    Historical(DbError),

    #[error("Could not delete active record: {0}")]
    DeleteActive(DbError),

    #[error("Finalize intent for {0} does not match its digest")]
    CorruptIntent(String),
}

/// Result of a finalize attempt that did not hit a store error.
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    /// Required fields are missing; nothing was written
    Rejected { missing: Vec<&'static str> },
    /// The record now lives in the historical collection only
    Finalized(HistoricalUpsert),
}

/// Outcome of replaying outstanding intents.
#[derive(Debug, Default)]
pub struct ResumeSummary {
    /// Record IDs whose move was completed
    pub completed: Vec<String>,
    /// Record IDs whose move failed again
    pub failed: Vec<(String, FinalizeError)>,
    /// Record IDs whose intent was discarded because the active record
    /// changed after the intent was written
    pub dropped: Vec<String>,
}

/// Labels of required fields that are missing or blank, in column order.
pub fn missing_required(fields: &AppointmentFields) -> Vec<&'static str> {
    let filled = |value: &Option<String>| value.as_deref().is_some_and(|s| !s.trim().is_empty());

    let mut missing = Vec::new();
    if fields.registration_number.trim().is_empty() {
        missing.push(RecordField::RegistrationNumber.label());
    }
    for field in REQUIRED_FOR_FINALIZE {
        let present = match field {
            RecordField::PatientProblem => filled(&fields.patient_problem),
            RecordField::DoctorAttended => filled(&fields.doctor_attended),
            RecordField::TreatmentDone => filled(&fields.treatment_done),
            // Zero counts as unpaid
            RecordField::Payment => fields.payment.is_some_and(|p| p > 0),
            RecordField::PaymentMode => fields.payment_mode.is_some(),
            _ => true,
        };
        if !present {
            missing.push(field.label());
        }
    }
    missing
}

/// Drives finalize against a store.
pub struct Finalizer<'a, S: AppointmentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: AppointmentStore + ?Sized> Finalizer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Validate a record and, if complete, move it to the historical collection.
    pub fn finalize(&self, record: &AppointmentRecord) -> Result<FinalizeOutcome, FinalizeError> {
        let missing = missing_required(&record.fields);
        if !missing.is_empty() {
            info!(record_id = %record.record_id, ?missing, "finalize rejected");
            return Ok(FinalizeOutcome::Rejected { missing });
        }

        let intent = FinalizeIntent::new(
            record.record_id.clone(),
            HistoricalFields::from(&record.fields),
        )?;
        self.store
            .save_finalize_intent(&intent)
            .map_err(FinalizeError::Intent)?;

        self.complete(&intent).map(FinalizeOutcome::Finalized)
    }

    /// Carry an intent through its remaining phases.
    pub fn complete(&self, intent: &FinalizeIntent) -> Result<HistoricalUpsert, FinalizeError> {
        if !intent.is_intact() {
            return Err(FinalizeError::CorruptIntent(intent.record_id.clone()));
        }

        let existing = match intent.phase {
            FinalizePhase::Pending => None,
            FinalizePhase::HistoricalWritten => self
                .store
                .find_historical(&intent.registration_number)
                .map_err(FinalizeError::Historical)?,
        };

        let upsert = match existing {
            Some(record) => HistoricalUpsert {
                record,
                created: false,
            },
            None => {
                let upsert = self
                    .store
                    .upsert_historical(&intent.payload)
                    .map_err(FinalizeError::Historical)?;
                // A lost phase update only means the upsert is repeated on resume
                if let Err(e) = self
                    .store
                    .advance_finalize_intent(&intent.record_id, FinalizePhase::HistoricalWritten)
                {
                    warn!(record_id = %intent.record_id, error = %e, "could not advance finalize intent");
                }
                upsert
            }
        };
        info!(
            record_id = %intent.record_id,
            registration_number = %intent.registration_number,
            created = upsert.created,
            "historical record written"
        );

        let deleted = self
            .store
            .delete_active(&intent.record_id)
            .map_err(FinalizeError::DeleteActive)?;
        if !deleted {
            debug!(record_id = %intent.record_id, "active record was already gone");
        }

        if let Err(e) = self.store.clear_finalize_intent(&intent.record_id) {
            warn!(record_id = %intent.record_id, error = %e, "could not clear finalize intent");
        }

        info!(record_id = %intent.record_id, "record finalized");
        Ok(upsert)
    }

    /// Replay every outstanding intent.
    pub fn resume_all(&self) -> Result<ResumeSummary, DbError> {
        let intents = self.store.list_finalize_intents()?;
        let mut summary = ResumeSummary::default();

        for intent in intents {
            match self.is_superseded(&intent) {
                Ok(true) => {
                    warn!(record_id = %intent.record_id, "active record changed since finalize; discarding intent");
                    match self.store.clear_finalize_intent(&intent.record_id) {
                        Ok(_) => summary.dropped.push(intent.record_id),
                        Err(e) => summary
                            .failed
                            .push((intent.record_id, FinalizeError::Intent(e))),
                    }
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    summary
                        .failed
                        .push((intent.record_id, FinalizeError::Intent(e)));
                    continue;
                }
            }

            info!(record_id = %intent.record_id, phase = intent.phase.as_str(), "resuming finalize");
            match self.complete(&intent) {
                Ok(_) => summary.completed.push(intent.record_id),
                Err(e) => {
                    warn!(record_id = %intent.record_id, error = %e, "resumed finalize failed");
                    summary.failed.push((intent.record_id, e));
                }
            }
        }
        Ok(summary)
    }

    /// Whether the active record was saved with different content after the
    /// intent was written. A missing active record is not a change.
    fn is_superseded(&self, intent: &FinalizeIntent) -> Result<bool, DbError> {
        let active = self.store.get_active(&intent.record_id)?;
        Ok(active.is_some_and(|record| HistoricalFields::from(&record.fields) != intent.payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{ActiveQuery, PaymentMode};

    fn complete_fields(reg: &str) -> AppointmentFields {
        let mut fields = AppointmentFields::new(reg.into(), "Asha Rao".into());
        fields.patient_problem = Some("Back pain".into());
        fields.doctor_attended = Some("Dr. Mehta".into());
        fields.treatment_done = Some("Physiotherapy".into());
        fields.payment = Some(500);
        fields.payment_mode = Some(PaymentMode::Cash);
        fields
    }

    #[test]
    fn test_missing_required_labels() {
        let mut fields = complete_fields("R100");
        assert!(missing_required(&fields).is_empty());

        fields.payment_mode = None;
        assert_eq!(missing_required(&fields), vec!["Payment Mode"]);

        fields.patient_problem = Some("   ".into());
        fields.registration_number = String::new();
        assert_eq!(
            missing_required(&fields),
            vec!["Registration Number", "Patient Problem", "Payment Mode"]
        );
    }

    #[test]
    fn test_zero_payment_is_missing() {
        let mut fields = complete_fields("R100");
        fields.payment = Some(0);
        assert_eq!(missing_required(&fields), vec!["Payment"]);

        let db = Database::open_in_memory().unwrap();
        let record = db.insert_active(&fields).unwrap();
        let outcome = Finalizer::new(&db).finalize(&record).unwrap();
        assert_eq!(
            outcome,
            FinalizeOutcome::Rejected {
                missing: vec!["Payment"]
            }
        );
        assert!(db.list_historical().unwrap().is_empty());
    }

    #[test]
    fn test_finalize_moves_record() {
        let db = Database::open_in_memory().unwrap();
        let record = db.insert_active(&complete_fields("R100")).unwrap();

        let outcome = Finalizer::new(&db).finalize(&record).unwrap();
        let FinalizeOutcome::Finalized(upsert) = outcome else {
            panic!("expected finalized outcome");
        };
        assert!(upsert.created);
        assert_eq!(upsert.record.fields.payment, Some(500));

        assert!(db.get_active(&record.record_id).unwrap().is_none());
        assert!(db.list_finalize_intents().unwrap().is_empty());
    }

    #[test]
    fn test_rejected_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let mut fields = complete_fields("R100");
        fields.treatment_done = None;
        let record = db.insert_active(&fields).unwrap();

        let outcome = Finalizer::new(&db).finalize(&record).unwrap();
        assert_eq!(
            outcome,
            FinalizeOutcome::Rejected {
                missing: vec!["Treatment Done"]
            }
        );
        assert_eq!(db.list_active(&ActiveQuery::all()).unwrap().len(), 1);
        assert!(db.list_historical().unwrap().is_empty());
        assert!(db.list_finalize_intents().unwrap().is_empty());
    }

    #[test]
    fn test_resume_historical_written_intent() {
        let db = Database::open_in_memory().unwrap();
        let record = db.insert_active(&complete_fields("R100")).unwrap();

        // Simulate a crash after the historical write
        let intent = FinalizeIntent::new(
            record.record_id.clone(),
            HistoricalFields::from(&record.fields),
        )
        .unwrap();
        db.save_finalize_intent(&intent).unwrap();
        db.upsert_historical(&intent.payload).unwrap();
        db.advance_finalize_intent(&record.record_id, FinalizePhase::HistoricalWritten)
            .unwrap();

        let summary = Finalizer::new(&db).resume_all().unwrap();
        assert_eq!(summary.completed, vec![record.record_id.clone()]);
        assert!(summary.failed.is_empty());

        assert!(db.get_active(&record.record_id).unwrap().is_none());
        assert_eq!(db.list_historical().unwrap().len(), 1);
        assert!(db.list_finalize_intents().unwrap().is_empty());
    }

    #[test]
    fn test_intent_superseded_by_later_save_is_dropped() {
        let db = Database::open_in_memory().unwrap();
        let record = db.insert_active(&complete_fields("R100")).unwrap();

        let intent = FinalizeIntent::new(
            record.record_id.clone(),
            HistoricalFields::from(&record.fields),
        )
        .unwrap();
        db.save_finalize_intent(&intent).unwrap();
        db.upsert_historical(&intent.payload).unwrap();
        db.advance_finalize_intent(&record.record_id, FinalizePhase::HistoricalWritten)
            .unwrap();

        let mut edited = record.fields.clone();
        edited.remarks = "corrected".into();
        db.update_active(&record.record_id, &edited).unwrap();

        let summary = Finalizer::new(&db).resume_all().unwrap();
        assert!(summary.completed.is_empty());
        assert_eq!(summary.dropped, vec![record.record_id.clone()]);

        let active = db.get_active(&record.record_id).unwrap().unwrap();
        assert_eq!(active.fields.remarks, "corrected");
        assert!(db.list_finalize_intents().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_intent_is_not_replayed() {
        let db = Database::open_in_memory().unwrap();
        let record = db.insert_active(&complete_fields("R100")).unwrap();

        let mut intent = FinalizeIntent::new(
            record.record_id.clone(),
            HistoricalFields::from(&record.fields),
        )
        .unwrap();
        intent.payload_digest = "0".repeat(64);
        db.save_finalize_intent(&intent).unwrap();

        let summary = Finalizer::new(&db).resume_all().unwrap();
        assert!(summary.completed.is_empty());
        assert!(matches!(
            summary.failed.as_slice(),
            [(_, FinalizeError::CorruptIntent(_))]
        ));
        assert!(db.get_active(&record.record_id).unwrap().is_some());
        assert!(db.list_historical().unwrap().is_empty());
    }
}
