//! Inline field editing and save-payload coercion.

use chrono::FixedOffset;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::db::DbError;
use crate::models::{
    format_timestamp, parse_date_input, AppointmentFields, InputKind, PaymentMode, RecordField,
};

/// Editing errors.
#[derive(Error, Debug)]
pub enum EditError {
    #[error("No loaded record with ID {0}")]
    UnknownRecord(String),

    #[error("Invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error(transparent)]
    Store(#[from] DbError),
}

/// Raw value coming from an input control.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    /// Text, date, number and select inputs
    Text(String),
    /// Checkbox state
    Flag(bool),
}

/// Keys carrying store metadata; never written back.
const METADATA_KEYS: [&str; 10] = [
    "$id",
    "$databaseId",
    "$collectionId",
    "$permissions",
    "$createdAt",
    "$updatedAt",
    "id",
    "record_id",
    "created_at",
    "updated_at",
];

/// Apply one edit to a record's fields.
///
/// Number fields fall back to 0 on unparseable input; text fields keep the
/// input verbatim. Bare dates are midnight at `offset`.
pub fn apply_input(
    fields: &mut AppointmentFields,
    field: RecordField,
    input: FieldInput,
    offset: FixedOffset,
) -> Result<(), EditError> {
    let invalid = |value: String| EditError::InvalidValue {
        field: field.label(),
        value,
    };

    match (field.input_kind(), input) {
        (InputKind::Checkbox, input) => {
            let flag = match input {
                FieldInput::Flag(flag) => flag,
                FieldInput::Text(raw) => parse_checkbox(&raw).ok_or_else(|| invalid(raw))?,
            };
            match field {
                RecordField::PackagePurchased => fields.package_purchased = flag,
                _ => fields.payment_received = flag,
            }
        }
        (_, FieldInput::Flag(flag)) => return Err(invalid(flag.to_string())),
        (InputKind::Number, FieldInput::Text(raw)) => {
            let count = parse_count(&raw);
            match field {
                RecordField::Payment => fields.payment = Some(count),
                _ => fields.remaining_sessions = count,
            }
        }
        (InputKind::Date, FieldInput::Text(raw)) => {
            fields.appointment_date = parse_date_input(&raw, offset).map_err(|_| invalid(raw))?;
        }
        (InputKind::Select, FieldInput::Text(raw)) => {
            fields.payment_mode = if raw.trim().is_empty() {
                None
            } else {
                Some(raw.parse::<PaymentMode>().map_err(|_| invalid(raw))?)
            };
        }
        (InputKind::Text, FieldInput::Text(raw)) => match field {
            RecordField::RegistrationNumber => fields.registration_number = raw,
            RecordField::PatientName => fields.patient_name = raw,
            RecordField::PatientProblem => fields.patient_problem = Some(raw),
            RecordField::DoctorAttended => fields.doctor_attended = Some(raw),
            RecordField::TreatmentDone => fields.treatment_done = Some(raw),
            _ => fields.remarks = raw,
        },
    }
    Ok(())
}

/// Parse a leading integer the way a number input does, clamped to
/// non-negative; anything unparseable becomes 0.
pub fn parse_count(raw: &str) -> u32 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let prefix: &str = {
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        &digits[..end]
    };
    if prefix.is_empty() || negative {
        return 0;
    }
    prefix.parse::<u32>().unwrap_or(u32::MAX)
}

fn parse_checkbox(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "on" | "1" | "yes" => Some(true),
        "false" | "off" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}

/// Turn a record payload into fields ready to persist.
///
/// Store metadata is stripped, flags are coerced with JavaScript truthiness,
/// counts become integers with a 0 fallback, and blank dates or payment
/// modes become absent. Keys the payload does not carry keep their value
/// from `base`.
pub fn coerce_payload(
    payload: &Value,
    base: &AppointmentFields,
    offset: FixedOffset,
) -> Result<AppointmentFields, EditError> {
    let Value::Object(map) = payload else {
        return Err(EditError::Payload("expected a JSON object".into()));
    };

    let mut map: Map<String, Value> = map
        .iter()
        .filter(|(key, _)| !METADATA_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    for key in [RecordField::PackagePurchased, RecordField::PaymentReceived] {
        if let Some(value) = map.get_mut(key.key()) {
            *value = Value::Bool(js_truthy(value));
        }
    }

    for key in [RecordField::RemainingSessions, RecordField::Payment] {
        if let Some(value) = map.get_mut(key.key()) {
            *value = Value::from(js_count(value));
        }
    }

    if let Some(value) = map.get_mut(RecordField::AppointmentDate.key()) {
        let normalized = match &*value {
            Value::String(raw) => match parse_date_input(raw, offset) {
                Ok(Some(date)) => Value::String(format_timestamp(&date)),
                Ok(None) => Value::Null,
                Err(e) => return Err(EditError::Payload(format!("AppointmentDate: {}", e))),
            },
            Value::Null => Value::Null,
            other => return Err(EditError::Payload(format!("AppointmentDate: {}", other))),
        };
        *value = normalized;
    }

    if let Some(value) = map.get_mut(RecordField::PaymentMode.key()) {
        if value.as_str().is_some_and(|s| s.trim().is_empty()) {
            *value = Value::Null;
        }
    }

    let payload_error = |e: serde_json::Error| EditError::Payload(e.to_string());
    let mut merged = match serde_json::to_value(base).map_err(payload_error)? {
        Value::Object(base_map) => base_map,
        _ => Map::new(),
    };
    merged.extend(map);

    serde_json::from_value(Value::Object(merged)).map_err(payload_error)
}

fn js_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn js_count(value: &Value) -> u32 {
    let number = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if number.is_finite() && number > 0.0 {
        number.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blank() -> AppointmentFields {
        AppointmentFields::new("R100".into(), "Asha Rao".into())
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("250"), 250);
        assert_eq!(parse_count("abc"), 0);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("12abc"), 12);
        assert_eq!(parse_count(" 7"), 7);
        assert_eq!(parse_count("-5"), 0);
        assert_eq!(parse_count("99999999999"), u32::MAX);
    }

    #[test]
    fn test_number_input_falls_back_to_zero() {
        let mut fields = blank();
        apply_input(&mut fields, RecordField::Payment, FieldInput::Text("abc".into()), utc()).unwrap();
        assert_eq!(fields.payment, Some(0));

        apply_input(&mut fields, RecordField::Payment, FieldInput::Text("250".into()), utc()).unwrap();
        assert_eq!(fields.payment, Some(250));

        apply_input(&mut fields, RecordField::RemainingSessions, FieldInput::Text("4".into()), utc())
            .unwrap();
        assert_eq!(fields.remaining_sessions, 4);
    }

    #[test]
    fn test_text_input_is_verbatim() {
        let mut fields = blank();
        apply_input(&mut fields, RecordField::Remarks, FieldInput::Text("  follow up ".into()), utc())
            .unwrap();
        assert_eq!(fields.remarks, "  follow up ");

        apply_input(&mut fields, RecordField::DoctorAttended, FieldInput::Text("".into()), utc()).unwrap();
        assert_eq!(fields.doctor_attended, Some(String::new()));
    }

    #[test]
    fn test_checkbox_input() {
        let mut fields = blank();
        apply_input(&mut fields, RecordField::PackagePurchased, FieldInput::Flag(true), utc()).unwrap();
        apply_input(&mut fields, RecordField::PaymentReceived, FieldInput::Text("on".into()), utc())
            .unwrap();
        assert!(fields.package_purchased);
        assert!(fields.payment_received);

        let result = apply_input(&mut fields, RecordField::Remarks, FieldInput::Flag(true), utc());
        assert!(matches!(result, Err(EditError::InvalidValue { .. })));
    }

    #[test]
    fn test_select_and_date_inputs() {
        let mut fields = blank();
        apply_input(&mut fields, RecordField::PaymentMode, FieldInput::Text("upi".into()), utc()).unwrap();
        assert_eq!(fields.payment_mode, Some(PaymentMode::Upi));

        let result = apply_input(&mut fields, RecordField::PaymentMode, FieldInput::Text("card".into()), utc());
        assert!(result.is_err());
        assert_eq!(fields.payment_mode, Some(PaymentMode::Upi));

        apply_input(&mut fields, RecordField::AppointmentDate, FieldInput::Text("2024-03-05".into()), utc())
            .unwrap();
        assert!(fields.appointment_date.is_some());

        let result = apply_input(&mut fields, RecordField::AppointmentDate, FieldInput::Text("soon".into()), utc());
        assert!(result.is_err());
        assert!(fields.appointment_date.is_some());
    }

    #[test]
    fn test_coerce_payload() {
        let payload = json!({
            "$id": "abc",
            "$createdAt": "2024-01-01T00:00:00.000Z",
            "$permissions": [],
            "RegistrationNumber": "R100",
            "AppointmentDate": "2024-03-05",
            "PatientName": "Asha Rao",
            "PackagePurchased": "yes",
            "PaymentReceived": 0,
            "RemainingSessions": "3",
            "Payment": "abc",
            "PaymentMode": "",
            "Remarks": "ok"
        });

        let fields = coerce_payload(&payload, &blank(), utc()).unwrap();
        assert_eq!(fields.registration_number, "R100");
        assert!(fields.package_purchased);
        assert!(!fields.payment_received);
        assert_eq!(fields.remaining_sessions, 3);
        assert_eq!(fields.payment, Some(0));
        assert_eq!(fields.payment_mode, None);
        assert!(fields.appointment_date.is_some());
    }

    #[test]
    fn test_coerce_payload_numbers() {
        let fields = coerce_payload(&json!({ "Payment": 250, "RemainingSessions": 2.7 }), &blank(), utc()).unwrap();
        assert_eq!(fields.payment, Some(250));
        assert_eq!(fields.remaining_sessions, 2);

        let fields = coerce_payload(&json!({ "Payment": "250" }), &blank(), utc()).unwrap();
        assert_eq!(fields.payment, Some(250));
    }

    #[test]
    fn test_coerce_payload_rejects_non_object() {
        assert!(matches!(coerce_payload(&json!([1, 2]), &blank(), utc()), Err(EditError::Payload(_))));
        assert!(matches!(
            coerce_payload(&json!({ "PaymentMode": "card" }), &blank(), utc()),
            Err(EditError::Payload(_))
        ));
    }

    #[test]
    fn test_coerce_payload_keeps_missing_keys() {
        let mut base = blank();
        base.patient_problem = Some("Back pain".into());
        base.payment = Some(500);

        let fields = coerce_payload(&json!({ "Remarks": "follow up" }), &base, utc()).unwrap();
        assert_eq!(fields.registration_number, "R100");
        assert_eq!(fields.patient_name, "Asha Rao");
        assert_eq!(fields.patient_problem.as_deref(), Some("Back pain"));
        assert_eq!(fields.payment, Some(500));
        assert_eq!(fields.remarks, "follow up");

        let fields = coerce_payload(&json!({ "PatientProblem": null }), &base, utc()).unwrap();
        assert_eq!(fields.patient_problem, None);
    }
}
