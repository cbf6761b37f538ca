//! Column sorting.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use feruca::Collator;

use crate::models::{AppointmentFields, AppointmentRecord, RecordField};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Current sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    /// None until a column has been clicked
    pub field: Option<RecordField>,
    pub direction: SortDirection,
}

impl SortState {
    /// State after clicking `field`: the same column flips, another column
    /// starts ascending.
    pub fn toggled(&self, field: RecordField) -> SortState {
        let direction = if self.field == Some(field) && self.direction == SortDirection::Ascending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        SortState {
            field: Some(field),
            direction,
        }
    }
}

/// Comparable value of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Text(String),
    Number(i64),
    Date(Option<DateTime<Utc>>),
    /// Fields without an ordering (flags)
    Unordered,
}

impl SortKey {
    /// Extract the sort key of a field. Missing values become empty text or zero.
    pub fn of(fields: &AppointmentFields, field: RecordField) -> SortKey {
        let text = |value: &Option<String>| SortKey::Text(value.clone().unwrap_or_default());
        match field {
            RecordField::RegistrationNumber => SortKey::Text(fields.registration_number.clone()),
            RecordField::AppointmentDate => SortKey::Date(fields.appointment_date),
            RecordField::PatientName => SortKey::Text(fields.patient_name.clone()),
            RecordField::PatientProblem => text(&fields.patient_problem),
            RecordField::DoctorAttended => text(&fields.doctor_attended),
            RecordField::TreatmentDone => text(&fields.treatment_done),
            RecordField::RemainingSessions => SortKey::Number(fields.remaining_sessions.into()),
            RecordField::Payment => SortKey::Number(fields.payment.unwrap_or(0).into()),
            RecordField::PaymentMode => SortKey::Text(
                fields
                    .payment_mode
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
            ),
            RecordField::Remarks => SortKey::Text(fields.remarks.clone()),
            RecordField::PackagePurchased | RecordField::PaymentReceived => SortKey::Unordered,
        }
    }

    /// Compare two keys. Keys of different shapes compare equal.
    pub fn compare(&self, other: &SortKey, collator: &mut Collator) -> Ordering {
        match (self, other) {
            (SortKey::Text(a), SortKey::Text(b)) => collator.collate(a.as_str(), b.as_str()),
            (SortKey::Number(a), SortKey::Number(b)) => a.cmp(b),
            // Undated records sort before dated ones
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Dictionary-style string order (Unicode Collation Algorithm, root locale):
/// accents and case only break ties, lowercase before uppercase.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    Collator::default().collate(a, b)
}

/// Sort records by a column, returning the sorted copy and the new sort state.
///
/// The sort is stable: records with equal keys keep their relative order.
pub fn sort_by(
    records: &[AppointmentRecord],
    field: RecordField,
    current: &SortState,
) -> (Vec<AppointmentRecord>, SortState) {
    let state = current.toggled(field);
    let mut collator = Collator::default();

    let mut keyed: Vec<(SortKey, &AppointmentRecord)> = records
        .iter()
        .map(|record| (SortKey::of(&record.fields, field), record))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match state.direction {
        SortDirection::Ascending => a.compare(b, &mut collator),
        SortDirection::Descending => b.compare(a, &mut collator),
    });

    let sorted = keyed.into_iter().map(|(_, record)| record.clone()).collect();
    (sorted, state)
}
