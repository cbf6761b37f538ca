//! SQLite schema definition.

/// Complete database schema for the clinic diary.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Active appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS active_appointments (
    record_id TEXT PRIMARY KEY,
    registration_number TEXT NOT NULL,
    appointment_date TEXT,                       -- RFC 3339, millisecond precision, UTC
    patient_name TEXT NOT NULL DEFAULT '',
    patient_problem TEXT,
    doctor_attended TEXT,
    treatment_done TEXT,
    package_purchased INTEGER NOT NULL DEFAULT 0,
    payment_received INTEGER NOT NULL DEFAULT 0,
    remaining_sessions INTEGER NOT NULL DEFAULT 0,
    payment INTEGER,
    payment_mode TEXT,                           -- 'cash' | 'upi' | 'at subscription'
    remarks TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_active_registration ON active_appointments(registration_number);
CREATE INDEX IF NOT EXISTS idx_active_date ON active_appointments(appointment_date);

-- ============================================================================
-- Historical records (one per registration number)
-- ============================================================================

CREATE TABLE IF NOT EXISTS historical_records (
    record_id TEXT PRIMARY KEY,
    registration_number TEXT NOT NULL UNIQUE,
    appointment_dates TEXT,
    patient_name TEXT NOT NULL DEFAULT '',
    patient_problem TEXT,
    doctor_attended TEXT,
    treatment_done TEXT,
    package_purchased INTEGER NOT NULL DEFAULT 0,
    payment_received INTEGER NOT NULL DEFAULT 0,
    remaining_sessions INTEGER NOT NULL DEFAULT 0,
    payment INTEGER,
    payment_mode TEXT,
    remarks TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- ============================================================================
-- Finalize intents
-- ============================================================================

CREATE TABLE IF NOT EXISTS finalize_intents (
    record_id TEXT PRIMARY KEY,
    registration_number TEXT NOT NULL,
    payload TEXT NOT NULL,                       -- JSON HistoricalFields
    payload_digest TEXT NOT NULL,                -- SHA-256 hex of payload
    phase TEXT NOT NULL DEFAULT 'pending',       -- 'pending' | 'historical_written'
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
