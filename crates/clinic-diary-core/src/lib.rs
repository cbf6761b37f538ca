//! Clinic Diary Core Library
//!
//! Local-first appointment diary for a physiotherapy clinic: the admin
//! dashboard that lists, filters, edits and finalizes patient appointments.
//!
//! # Architecture
//!
//! ```text
//!   Booking flow ──► active_appointments
//!                           │
//!              load / search (filters, newest first)
//!                           │
//!                  ┌────────▼────────┐
//!                  │    Dashboard    │  sort · paginate · inline edit
//!                  └────────┬────────┘
//!                           │ save ──► active_appointments
//!                           │
//!                        finalize
//!                           │
//!             ┌─────────────▼─────────────┐
//!             │  finalize_intents (phase)  │
//!             └─────────────┬─────────────┘
//!                           │
//!          upsert historical_records (by registration number)
//!                           │
//!                 delete active + clear intent
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite document store behind the [`db::AppointmentStore`] trait
//! - [`models`]: Domain types (appointments, historical records, search)
//! - [`dashboard`]: The record manager (sorting, paging, editing, finalize)
//! - [`config`]: Environment-driven settings

pub mod config;
pub mod dashboard;
pub mod db;
pub mod models;

// Re-export commonly used types
pub use config::{ConfigError, DashboardConfig};
pub use dashboard::{
    Dashboard, FieldInput, FinalizeOutcome, NavigationTarget, Notification, NotificationLevel,
    PageInfo, SortDirection, SortState,
};
pub use db::{AppointmentStore, Database};
pub use models::{
    AppointmentFields, AppointmentRecord, HistoricalFields, HistoricalRecord, PaymentMode,
    RecordField, SearchCriteria,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dashboard::{EditError, FinalizeError, ResumeSummary};
use models::{format_timestamp, InputKind, COLUMNS};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicDiaryError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for ClinicDiaryError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(id) => ClinicDiaryError::NotFound(id),
            other => ClinicDiaryError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ClinicDiaryError {
    fn from(e: serde_json::Error) -> Self {
        ClinicDiaryError::SerializationError(e.to_string())
    }
}

impl From<EditError> for ClinicDiaryError {
    fn from(e: EditError) -> Self {
        match e {
            EditError::UnknownRecord(id) => ClinicDiaryError::NotFound(id),
            EditError::Store(db) => db.into(),
            other => ClinicDiaryError::InvalidInput(other.to_string()),
        }
    }
}

impl From<FinalizeError> for ClinicDiaryError {
    fn from(e: FinalizeError) -> Self {
        match e {
            FinalizeError::NotFound(id) => ClinicDiaryError::NotFound(id),
            FinalizeError::Payload(json) => json.into(),
            other => ClinicDiaryError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ConfigError> for ClinicDiaryError {
    fn from(e: ConfigError) -> Self {
        ClinicDiaryError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicDiaryError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicDiaryError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `filter`. Calling this more than once is
/// harmless; only the first call installs a subscriber.
#[uniffi::export]
pub fn init_logging(filter: String) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Open or create a diary database at the given path.
#[uniffi::export]
pub fn open_dashboard(path: String) -> Result<Arc<ClinicDiaryCore>, ClinicDiaryError> {
    let config = DashboardConfig {
        database_path: path,
        ..Default::default()
    };
    ClinicDiaryCore::open(config)
}

/// Create a dashboard over an in-memory database (for testing).
#[uniffi::export]
pub fn open_dashboard_in_memory() -> Result<Arc<ClinicDiaryCore>, ClinicDiaryError> {
    let db = Database::open_in_memory()?;
    Ok(ClinicDiaryCore::wrap(db, DashboardConfig::default()))
}

/// Open the dashboard described by the `CLINIC_DIARY_*` environment
/// variables, installing logging with the configured filter.
#[uniffi::export]
pub fn open_dashboard_from_env() -> Result<Arc<ClinicDiaryCore>, ClinicDiaryError> {
    let config = DashboardConfig::from_env()?;
    init_logging(config.log_filter.clone());
    ClinicDiaryCore::open(config)
}

/// Columns of the appointment table, in display order.
#[uniffi::export]
pub fn dashboard_columns() -> Vec<FfiColumn> {
    COLUMNS.iter().map(|field| FfiColumn::from(*field)).collect()
}

/// Route for a navigation button.
#[uniffi::export]
pub fn navigation_route(target: FfiNavigationTarget) -> String {
    NavigationTarget::from(target).route().to_string()
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe dashboard wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ClinicDiaryCore {
    dashboard: Mutex<Dashboard<Database>>,
}

impl ClinicDiaryCore {
    fn open(config: DashboardConfig) -> Result<Arc<Self>, ClinicDiaryError> {
        let db = Database::open(&config.database_path)?;
        Ok(Self::wrap(db, config))
    }

    fn wrap(db: Database, config: DashboardConfig) -> Arc<Self> {
        Arc::new(Self {
            dashboard: Mutex::new(Dashboard::new(db, config)),
        })
    }
}

#[uniffi::export]
impl ClinicDiaryCore {
    // =========================================================================
    // Loading
    // =========================================================================

    /// Resume interrupted finalizes and load every active record.
    /// Returns false if the load failed (see [`Self::banner`]).
    pub fn mount(&self) -> Result<bool, ClinicDiaryError> {
        let mut dashboard = self.dashboard.lock()?;
        Ok(dashboard.mount())
    }

    /// Reload every active record.
    pub fn load_all(&self) -> Result<bool, ClinicDiaryError> {
        let mut dashboard = self.dashboard.lock()?;
        Ok(dashboard.load_all())
    }

    /// Load active records matching the search form.
    pub fn search(&self, criteria: FfiSearchCriteria) -> Result<bool, ClinicDiaryError> {
        let criteria = SearchCriteria::try_from(criteria)?;
        let mut dashboard = self.dashboard.lock()?;
        Ok(dashboard.load_active(&criteria))
    }

    /// Current fetch/search error message.
    pub fn banner(&self) -> Result<Option<String>, ClinicDiaryError> {
        let dashboard = self.dashboard.lock()?;
        Ok(dashboard.banner().map(str::to_string))
    }

    // =========================================================================
    // Sorting and paging
    // =========================================================================

    /// Sort by a column key (e.g. `PatientName`).
    pub fn sort_by(&self, field: String) -> Result<FfiSortState, ClinicDiaryError> {
        let field = parse_field(&field)?;
        let mut dashboard = self.dashboard.lock()?;
        Ok(dashboard.sort_by(field).into())
    }

    pub fn sort_state(&self) -> Result<FfiSortState, ClinicDiaryError> {
        let dashboard = self.dashboard.lock()?;
        Ok(dashboard.sort_state().into())
    }

    /// Rows of the current page.
    pub fn visible_rows(&self) -> Result<Vec<FfiAppointment>, ClinicDiaryError> {
        let dashboard = self.dashboard.lock()?;
        Ok(dashboard
            .visible_records()
            .iter()
            .cloned()
            .map(FfiAppointment::from)
            .collect())
    }

    pub fn page_info(&self) -> Result<FfiPageInfo, ClinicDiaryError> {
        let dashboard = self.dashboard.lock()?;
        Ok(dashboard.page_info().into())
    }

    pub fn next_page(&self) -> Result<FfiPageInfo, ClinicDiaryError> {
        let mut dashboard = self.dashboard.lock()?;
        Ok(dashboard.next_page().into())
    }

    pub fn previous_page(&self) -> Result<FfiPageInfo, ClinicDiaryError> {
        let mut dashboard = self.dashboard.lock()?;
        Ok(dashboard.previous_page().into())
    }

    pub fn go_to_page(&self, page: u32) -> Result<FfiPageInfo, ClinicDiaryError> {
        let mut dashboard = self.dashboard.lock()?;
        Ok(dashboard.go_to_page(page as usize).into())
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Edit a text, date, number or select field of a loaded record.
    pub fn set_field(
        &self,
        record_id: String,
        field: String,
        value: String,
    ) -> Result<FfiAppointment, ClinicDiaryError> {
        let field = parse_field(&field)?;
        let mut dashboard = self.dashboard.lock()?;
        let record = dashboard.set_field(&record_id, field, FieldInput::Text(value))?;
        Ok(record.clone().into())
    }

    /// Toggle a checkbox field of a loaded record.
    pub fn set_flag(
        &self,
        record_id: String,
        field: String,
        value: bool,
    ) -> Result<FfiAppointment, ClinicDiaryError> {
        let field = parse_field(&field)?;
        let mut dashboard = self.dashboard.lock()?;
        let record = dashboard.set_field(&record_id, field, FieldInput::Flag(value))?;
        Ok(record.clone().into())
    }

    /// Persist the local edits of a record.
    pub fn save_record(&self, record_id: String) -> Result<FfiAppointment, ClinicDiaryError> {
        let mut dashboard = self.dashboard.lock()?;
        Ok(dashboard.save_record(&record_id)?.into())
    }

    /// Persist a full record payload given as JSON.
    pub fn save_record_json(
        &self,
        record_id: String,
        payload: String,
    ) -> Result<FfiAppointment, ClinicDiaryError> {
        let payload: serde_json::Value = serde_json::from_str(&payload)?;
        let mut dashboard = self.dashboard.lock()?;
        Ok(dashboard.save_payload(&record_id, &payload)?.into())
    }

    // =========================================================================
    // Finalizing
    // =========================================================================

    /// Validate a record and move it to the historical collection.
    pub fn finalize_record(
        &self,
        record_id: String,
    ) -> Result<FfiFinalizeOutcome, ClinicDiaryError> {
        let mut dashboard = self.dashboard.lock()?;
        Ok(dashboard.finalize(&record_id)?.into())
    }

    /// Complete finalizes interrupted by an earlier failure.
    pub fn resume_pending_finalizations(&self) -> Result<FfiResumeSummary, ClinicDiaryError> {
        let mut dashboard = self.dashboard.lock()?;
        Ok(dashboard.resume_pending_finalizations()?.into())
    }

    // =========================================================================
    // Notifications and other views
    // =========================================================================

    /// Drain pending notifications.
    pub fn take_notifications(&self) -> Result<Vec<FfiNotification>, ClinicDiaryError> {
        let mut dashboard = self.dashboard.lock()?;
        Ok(dashboard
            .take_notifications()
            .into_iter()
            .map(FfiNotification::from)
            .collect())
    }

    /// Every historical record, ordered by registration number.
    pub fn list_historical(&self) -> Result<Vec<FfiHistoricalRecord>, ClinicDiaryError> {
        let dashboard = self.dashboard.lock()?;
        let records = dashboard.list_historical()?;
        Ok(records.into_iter().map(FfiHistoricalRecord::from).collect())
    }

    pub fn columns(&self) -> Vec<FfiColumn> {
        dashboard_columns()
    }

    /// Route for a navigation button.
    pub fn navigate(&self, target: FfiNavigationTarget) -> Result<String, ClinicDiaryError> {
        let dashboard = self.dashboard.lock()?;
        Ok(dashboard.navigate(target.into()).to_string())
    }
}

fn parse_field(key: &str) -> Result<RecordField, ClinicDiaryError> {
    RecordField::from_str(key).map_err(ClinicDiaryError::InvalidInput)
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe active appointment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub record_id: String,
    pub registration_number: String,
    /// RFC 3339 timestamp
    pub appointment_date: Option<String>,
    pub patient_name: String,
    pub patient_problem: Option<String>,
    pub doctor_attended: Option<String>,
    pub treatment_done: Option<String>,
    pub package_purchased: bool,
    pub payment_received: bool,
    pub remaining_sessions: u32,
    pub payment: Option<u32>,
    pub payment_mode: Option<String>,
    pub remarks: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<AppointmentRecord> for FfiAppointment {
    fn from(record: AppointmentRecord) -> Self {
        let fields = record.fields;
        Self {
            record_id: record.record_id,
            registration_number: fields.registration_number,
            appointment_date: fields.appointment_date.as_ref().map(format_timestamp),
            patient_name: fields.patient_name,
            patient_problem: fields.patient_problem,
            doctor_attended: fields.doctor_attended,
            treatment_done: fields.treatment_done,
            package_purchased: fields.package_purchased,
            payment_received: fields.payment_received,
            remaining_sessions: fields.remaining_sessions,
            payment: fields.payment,
            payment_mode: fields.payment_mode.map(|m| m.as_str().to_string()),
            remarks: fields.remarks,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// FFI-safe historical record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHistoricalRecord {
    pub record_id: String,
    pub registration_number: String,
    pub appointment_dates: Option<String>,
    pub patient_name: String,
    pub patient_problem: Option<String>,
    pub doctor_attended: Option<String>,
    pub treatment_done: Option<String>,
    pub package_purchased: bool,
    pub payment_received: bool,
    pub remaining_sessions: u32,
    pub payment: Option<u32>,
    pub payment_mode: Option<String>,
    pub remarks: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<HistoricalRecord> for FfiHistoricalRecord {
    fn from(record: HistoricalRecord) -> Self {
        let fields = record.fields;
        Self {
            record_id: record.record_id,
            registration_number: fields.registration_number,
            appointment_dates: fields.appointment_dates.as_ref().map(format_timestamp),
            patient_name: fields.patient_name,
            patient_problem: fields.patient_problem,
            doctor_attended: fields.doctor_attended,
            treatment_done: fields.treatment_done,
            package_purchased: fields.package_purchased,
            payment_received: fields.payment_received,
            remaining_sessions: fields.remaining_sessions,
            payment: fields.payment,
            payment_mode: fields.payment_mode.map(|m| m.as_str().to_string()),
            remarks: fields.remarks,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// FFI-safe search form. Dates are `YYYY-MM-DD`; blank values are ignored.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiSearchCriteria {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub registration_number: Option<String>,
    pub patient_name: Option<String>,
}

impl TryFrom<FfiSearchCriteria> for SearchCriteria {
    type Error = ClinicDiaryError;

    fn try_from(criteria: FfiSearchCriteria) -> Result<Self, Self::Error> {
        Ok(SearchCriteria {
            date_from: parse_search_date(criteria.date_from.as_deref())?,
            date_to: parse_search_date(criteria.date_to.as_deref())?,
            registration_number: criteria.registration_number,
            patient_name: criteria.patient_name,
        })
    }
}

fn parse_search_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ClinicDiaryError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| ClinicDiaryError::InvalidInput(format!("{}: {}", raw, e))),
    }
}

/// FFI-safe sort state.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSortState {
    /// Column key, None until a column has been sorted
    pub field: Option<String>,
    pub ascending: bool,
}

impl From<SortState> for FfiSortState {
    fn from(state: SortState) -> Self {
        Self {
            field: state.field.map(|f| f.key().to_string()),
            ascending: state.direction == SortDirection::Ascending,
        }
    }
}

/// FFI-safe pagination controls.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPageInfo {
    pub current: u32,
    pub page_count: u32,
    pub total: u32,
    pub has_previous: bool,
    pub has_next: bool,
}

impl From<PageInfo> for FfiPageInfo {
    fn from(info: PageInfo) -> Self {
        let to_u32 = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        Self {
            current: to_u32(info.current),
            page_count: to_u32(info.page_count),
            total: to_u32(info.total),
            has_previous: info.has_previous,
            has_next: info.has_next,
        }
    }
}

/// FFI-safe table column.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiColumn {
    pub key: String,
    pub label: String,
    /// text, date, checkbox, number or select
    pub input_kind: String,
}

impl From<RecordField> for FfiColumn {
    fn from(field: RecordField) -> Self {
        let input_kind = match field.input_kind() {
            InputKind::Text => "text",
            InputKind::Date => "date",
            InputKind::Checkbox => "checkbox",
            InputKind::Number => "number",
            InputKind::Select => "select",
        };
        Self {
            key: field.key().to_string(),
            label: field.label().to_string(),
            input_kind: input_kind.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiNotificationLevel {
    Success,
    Error,
}

/// FFI-safe notification.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNotification {
    pub level: FfiNotificationLevel,
    pub message: String,
}

impl From<Notification> for FfiNotification {
    fn from(notification: Notification) -> Self {
        let level = match notification.level {
            NotificationLevel::Success => FfiNotificationLevel::Success,
            NotificationLevel::Error => FfiNotificationLevel::Error,
        };
        Self {
            level,
            message: notification.message,
        }
    }
}

/// FFI-safe finalize outcome.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiFinalizeOutcome {
    Rejected {
        missing: Vec<String>,
    },
    Finalized {
        record: FfiHistoricalRecord,
        created: bool,
    },
}

impl From<FinalizeOutcome> for FfiFinalizeOutcome {
    fn from(outcome: FinalizeOutcome) -> Self {
        match outcome {
            FinalizeOutcome::Rejected { missing } => FfiFinalizeOutcome::Rejected {
                missing: missing.into_iter().map(str::to_string).collect(),
            },
            FinalizeOutcome::Finalized(upsert) => FfiFinalizeOutcome::Finalized {
                record: upsert.record.into(),
                created: upsert.created,
            },
        }
    }
}

/// FFI-safe resume summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiResumeSummary {
    pub completed: Vec<String>,
    /// Record IDs whose move failed again
    pub failed: Vec<String>,
    /// Record IDs whose pending move was discarded by a later save
    pub dropped: Vec<String>,
}

impl From<ResumeSummary> for FfiResumeSummary {
    fn from(summary: ResumeSummary) -> Self {
        Self {
            completed: summary.completed,
            failed: summary.failed.into_iter().map(|(id, _)| id).collect(),
            dropped: summary.dropped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiNavigationTarget {
    RegisteredUsers,
    HistoricalData,
    BookAppointment,
}

impl From<FfiNavigationTarget> for NavigationTarget {
    fn from(target: FfiNavigationTarget) -> Self {
        match target {
            FfiNavigationTarget::RegisteredUsers => NavigationTarget::RegisteredUsers,
            FfiNavigationTarget::HistoricalData => NavigationTarget::HistoricalData,
            FfiNavigationTarget::BookAppointment => NavigationTarget::BookAppointment,
        }
    }
}
