//! Historical (finalized) appointment models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::appointment::{AppointmentFields, PaymentMode};

/// Fields of a finalized appointment.
///
/// Same shape as [`AppointmentFields`] except that the appointment date is
/// stored under `AppointmentDates`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct HistoricalFields {
    pub registration_number: String,
    pub appointment_dates: Option<DateTime<Utc>>,
    pub patient_name: String,
    pub patient_problem: Option<String>,
    pub doctor_attended: Option<String>,
    pub treatment_done: Option<String>,
    pub package_purchased: bool,
    pub payment_received: bool,
    pub remaining_sessions: u32,
    pub payment: Option<u32>,
    pub payment_mode: Option<PaymentMode>,
    pub remarks: String,
}

impl From<&AppointmentFields> for HistoricalFields {
    fn from(fields: &AppointmentFields) -> Self {
        Self {
            registration_number: fields.registration_number.clone(),
            appointment_dates: fields.appointment_date,
            patient_name: fields.patient_name.clone(),
            patient_problem: fields.patient_problem.clone(),
            doctor_attended: fields.doctor_attended.clone(),
            treatment_done: fields.treatment_done.clone(),
            package_purchased: fields.package_purchased,
            payment_received: fields.payment_received,
            remaining_sessions: fields.remaining_sessions,
            payment: fields.payment,
            payment_mode: fields.payment_mode,
            remarks: fields.remarks.clone(),
        }
    }
}

/// A record in the historical collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalRecord {
    /// Store-assigned identifier
    pub record_id: String,
    #[serde(flatten)]
    pub fields: HistoricalFields,
    pub created_at: String,
    pub updated_at: String,
}

/// Result of an upsert into the historical collection.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalUpsert {
    /// The record as stored after the write
    pub record: HistoricalRecord,
    /// True if a new record was inserted, false if an existing one was overwritten
    pub created: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_appointment_renames_date() {
        let mut fields = AppointmentFields::new("R100".into(), "Asha Rao".into());
        fields.appointment_date = Some(Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap());
        fields.payment = Some(250);

        let historical = HistoricalFields::from(&fields);
        assert_eq!(historical.appointment_dates, fields.appointment_date);
        assert_eq!(historical.payment, Some(250));

        let json = serde_json::to_value(&historical).unwrap();
        assert!(json.get("AppointmentDates").is_some());
        assert!(json.get("AppointmentDate").is_none());
    }
}
