//! Appointment models for the active collection.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp::now_timestamp;

/// How a visit was paid for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMode {
    #[serde(rename = "cash")]
    Cash,
    #[serde(rename = "upi")]
    Upi,
    #[serde(rename = "at subscription", alias = "at_subscription")]
    AtSubscription,
}

impl PaymentMode {
    /// Stored/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "cash",
            PaymentMode::Upi => "upi",
            PaymentMode::AtSubscription => "at subscription",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMode::Cash),
            "upi" => Ok(PaymentMode::Upi),
            "at subscription" | "at_subscription" => Ok(PaymentMode::AtSubscription),
            other => Err(format!("Unknown payment mode: {}", other)),
        }
    }
}

/// The editable part of an appointment: everything except store metadata.
///
/// Serialized with the PascalCase keys used by the booking flow
/// (`RegistrationNumber`, `AppointmentDate`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct AppointmentFields {
    /// Business key shared with the historical collection
    pub registration_number: String,
    /// Date (and time) of the appointment
    pub appointment_date: Option<DateTime<Utc>>,
    pub patient_name: String,
    pub patient_problem: Option<String>,
    pub doctor_attended: Option<String>,
    pub treatment_done: Option<String>,
    pub package_purchased: bool,
    pub payment_received: bool,
    /// Sessions left on a purchased package
    pub remaining_sessions: u32,
    /// Amount paid, in whole currency units
    pub payment: Option<u32>,
    pub payment_mode: Option<PaymentMode>,
    pub remarks: String,
}

impl AppointmentFields {
    /// Create fields for a freshly booked appointment.
    pub fn new(registration_number: String, patient_name: String) -> Self {
        Self {
            registration_number,
            patient_name,
            ..Default::default()
        }
    }
}

/// An appointment as held by the active collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentRecord {
    /// Store-assigned identifier
    pub record_id: String,
    #[serde(flatten)]
    pub fields: AppointmentFields,
    /// Creation timestamp (store-managed)
    pub created_at: String,
    /// Last update timestamp (store-managed)
    pub updated_at: String,
}

impl AppointmentRecord {
    /// Wrap fields into a new record with a fresh identifier.
    pub fn new(fields: AppointmentFields) -> Self {
        let now = now_timestamp();
        Self {
            record_id: uuid::Uuid::new_v4().to_string(),
            fields,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Kind of input control a column is edited with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Date,
    Checkbox,
    Number,
    Select,
}

/// A column of the appointment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    RegistrationNumber,
    AppointmentDate,
    PatientName,
    PatientProblem,
    DoctorAttended,
    TreatmentDone,
    PackagePurchased,
    RemainingSessions,
    PaymentReceived,
    Payment,
    PaymentMode,
    Remarks,
}

/// Columns shown in the dashboard table, in display order.
///
/// `RemainingSessions` is tracked on every record but not shown.
pub const COLUMNS: [RecordField; 11] = [
    RecordField::RegistrationNumber,
    RecordField::AppointmentDate,
    RecordField::PatientName,
    RecordField::PatientProblem,
    RecordField::DoctorAttended,
    RecordField::TreatmentDone,
    RecordField::PackagePurchased,
    RecordField::PaymentReceived,
    RecordField::Payment,
    RecordField::PaymentMode,
    RecordField::Remarks,
];

impl RecordField {
    /// Wire key of the field.
    pub fn key(&self) -> &'static str {
        match self {
            RecordField::RegistrationNumber => "RegistrationNumber",
            RecordField::AppointmentDate => "AppointmentDate",
            RecordField::PatientName => "PatientName",
            RecordField::PatientProblem => "PatientProblem",
            RecordField::DoctorAttended => "DoctorAttended",
            RecordField::TreatmentDone => "TreatmentDone",
            RecordField::PackagePurchased => "PackagePurchased",
            RecordField::RemainingSessions => "RemainingSessions",
            RecordField::PaymentReceived => "PaymentReceived",
            RecordField::Payment => "Payment",
            RecordField::PaymentMode => "PaymentMode",
            RecordField::Remarks => "Remarks",
        }
    }

    /// Human-readable column label.
    pub fn label(&self) -> &'static str {
        match self {
            RecordField::RegistrationNumber => "Registration Number",
            RecordField::AppointmentDate => "Appointment Date",
            RecordField::PatientName => "Patient Name",
            RecordField::PatientProblem => "Patient Problem",
            RecordField::DoctorAttended => "Doctor Attended",
            RecordField::TreatmentDone => "Treatment Done",
            RecordField::PackagePurchased => "Package Purchased",
            RecordField::RemainingSessions => "Remaining Sessions",
            RecordField::PaymentReceived => "Payment Received",
            RecordField::Payment => "Payment",
            RecordField::PaymentMode => "Payment Mode",
            RecordField::Remarks => "Remarks",
        }
    }

    /// Input control used to edit the field.
    pub fn input_kind(&self) -> InputKind {
        match self {
            RecordField::AppointmentDate => InputKind::Date,
            RecordField::PackagePurchased | RecordField::PaymentReceived => InputKind::Checkbox,
            RecordField::RemainingSessions | RecordField::Payment => InputKind::Number,
            RecordField::PaymentMode => InputKind::Select,
            _ => InputKind::Text,
        }
    }
}

impl FromStr for RecordField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        COLUMNS
            .iter()
            .chain(std::iter::once(&RecordField::RemainingSessions))
            .find(|field| field.key() == s)
            .copied()
            .ok_or_else(|| format!("Unknown field: {}", s))
    }
}
