//! Appointment record manager.
//!
//! [`Dashboard`] owns the state behind the appointment table: the loaded
//! records, sort and page state, the sticky error banner and the queue of
//! transient notifications. Filtering, sorting and paging are pure functions
//! in the submodules; every store access goes through [`AppointmentStore`].
//!
//! Store failures never propagate past the dashboard unannounced: fetch
//! failures set the banner and keep the previous records, write failures
//! queue an error notification and keep local edits.

mod editor;
mod finalize;
mod navigation;
mod paginate;
mod sort;

pub use editor::*;
pub use finalize::*;
pub use navigation::*;
pub use paginate::*;
pub use sort::*;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::DashboardConfig;
use crate::db::{AppointmentStore, DbResult};
use crate::models::{
    ActiveQuery, AppointmentFields, AppointmentRecord, HistoricalRecord, RecordField,
    SearchCriteria,
};

/// Banner shown when the initial load fails.
pub const FETCH_FAILED: &str = "Failed to fetch patient records. Please try again.";
/// Banner shown when a search fails.
pub const SEARCH_FAILED: &str = "Search failed. Please check your input and try again.";

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A transient message for the user (toast / alert).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Dashboard state and operations.
pub struct Dashboard<S: AppointmentStore> {
    store: S,
    config: DashboardConfig,
    records: Vec<AppointmentRecord>,
    sort: SortState,
    page: PageState,
    banner: Option<String>,
    notifications: Vec<Notification>,
}

impl<S: AppointmentStore> Dashboard<S> {
    /// Create an empty dashboard over a store.
    pub fn new(store: S, config: DashboardConfig) -> Self {
        let page = PageState::new(config.page_size);
        Self {
            store,
            config,
            records: Vec::new(),
            sort: SortState::default(),
            page,
            banner: None,
            notifications: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// All loaded records, in current order.
    pub fn records(&self) -> &[AppointmentRecord] {
        &self.records
    }

    /// A loaded record by ID.
    pub fn record(&self, record_id: &str) -> Option<&AppointmentRecord> {
        self.records.iter().find(|r| r.record_id == record_id)
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    /// Current fetch/search error, if any.
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Drain queued notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Initial load: finish interrupted finalizes, then fetch everything.
    pub fn mount(&mut self) -> bool {
        if let Err(e) = self.resume_pending_finalizations() {
            warn!(error = %e, "could not list pending finalize intents");
        }
        self.load_all()
    }

    /// Fetch every active record.
    pub fn load_all(&mut self) -> bool {
        self.fetch(&ActiveQuery::all(), FETCH_FAILED)
    }

    /// Fetch active records matching the search form.
    pub fn load_active(&mut self, criteria: &SearchCriteria) -> bool {
        let query = criteria.to_query(self.config.utc_offset());
        self.fetch(&query, SEARCH_FAILED)
    }

    fn fetch(&mut self, query: &ActiveQuery, failure_message: &str) -> bool {
        match self.store.list_active(query) {
            Ok(records) => {
                info!(count = records.len(), "loaded active appointments");
                self.records = records;
                self.banner = None;
                self.on_new_results();
                true
            }
            Err(e) => {
                warn!(error = %e, "fetching active appointments failed");
                self.banner = Some(failure_message.to_string());
                false
            }
        }
    }

    fn on_new_results(&mut self) {
        if self.config.reset_page_on_new_results {
            self.page.reset();
        }
    }

    // =========================================================================
    // Sorting and paging
    // =========================================================================

    /// Sort the loaded records by a column (click on a header).
    pub fn sort_by(&mut self, field: RecordField) -> SortState {
        let (sorted, state) = sort::sort_by(&self.records, field, &self.sort);
        self.records = sorted;
        self.sort = state;
        self.on_new_results();
        state
    }

    /// Rows of the current page.
    pub fn visible_records(&self) -> &[AppointmentRecord] {
        paginate(&self.records, self.page.current, self.page.size)
    }

    pub fn page_info(&self) -> PageInfo {
        PageInfo::new(&self.page, self.records.len())
    }

    pub fn next_page(&mut self) -> PageInfo {
        self.page.next(self.records.len());
        self.page_info()
    }

    pub fn previous_page(&mut self) -> PageInfo {
        self.page.previous();
        self.page_info()
    }

    pub fn go_to_page(&mut self, page: usize) -> PageInfo {
        self.page.go_to(page, self.records.len());
        self.page_info()
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Change one field of a loaded record. Nothing is persisted.
    pub fn set_field(
        &mut self,
        record_id: &str,
        field: RecordField,
        input: FieldInput,
    ) -> Result<&AppointmentRecord, EditError> {
        let offset = self.config.utc_offset();
        let record = self
            .records
            .iter_mut()
            .find(|r| r.record_id == record_id)
            .ok_or_else(|| EditError::UnknownRecord(record_id.to_string()))?;
        apply_input(&mut record.fields, field, input, offset)?;
        Ok(&*record)
    }

    /// Persist the locally edited state of a record.
    pub fn save_record(&mut self, record_id: &str) -> Result<AppointmentRecord, EditError> {
        let fields = match self.record(record_id) {
            Some(record) => record.fields.clone(),
            None => return Err(self.save_failed(EditError::UnknownRecord(record_id.to_string()))),
        };
        self.persist(record_id, &fields)
    }

    /// Persist a record payload (as sent by the table row). Keys the payload
    /// leaves out keep the loaded record's values.
    pub fn save_payload(
        &mut self,
        record_id: &str,
        payload: &Value,
    ) -> Result<AppointmentRecord, EditError> {
        let base = match self.record(record_id) {
            Some(record) => record.fields.clone(),
            None => return Err(self.save_failed(EditError::UnknownRecord(record_id.to_string()))),
        };
        let fields = coerce_payload(payload, &base, self.config.utc_offset())
            .map_err(|e| self.save_failed(e))?;
        self.persist(record_id, &fields)
    }

    fn persist(
        &mut self,
        record_id: &str,
        fields: &AppointmentFields,
    ) -> Result<AppointmentRecord, EditError> {
        match self.store.update_active(record_id, fields) {
            Ok(saved) => {
                if let Some(local) = self.records.iter_mut().find(|r| r.record_id == record_id) {
                    *local = saved.clone();
                }
                // A finalize left pending by an earlier failure would replay
                // the pre-save payload
                match self.store.clear_finalize_intent(record_id) {
                    Ok(true) => info!(record_id, "discarded pending finalize superseded by save"),
                    Ok(false) => {}
                    Err(e) => warn!(record_id, error = %e, "could not discard pending finalize"),
                }
                info!(record_id, "record saved");
                self.notify(NotificationLevel::Success, "Record updated successfully!".into());
                Ok(saved)
            }
            Err(e) => Err(self.save_failed(e.into())),
        }
    }

    fn save_failed(&mut self, error: EditError) -> EditError {
        warn!(error = %error, "saving record failed");
        self.notify(
            NotificationLevel::Error,
            format!("Failed to update the record. Error: {}", error),
        );
        error
    }

    // =========================================================================
    // Finalizing
    // =========================================================================

    /// Validate a loaded record and move it to the historical collection.
    pub fn finalize(&mut self, record_id: &str) -> Result<FinalizeOutcome, FinalizeError> {
        let Some(record) = self.record(record_id).cloned() else {
            let error = FinalizeError::NotFound(record_id.to_string());
            self.notify_finalize_failed(&error);
            return Err(error);
        };

        let result = Finalizer::new(&self.store).finalize(&record);
        match &result {
            Ok(FinalizeOutcome::Rejected { missing }) => self.notify(
                NotificationLevel::Error,
                format!(
                    "Please fill in the following required fields: {}",
                    missing.join(", ")
                ),
            ),
            Ok(FinalizeOutcome::Finalized(_)) => {
                self.records.retain(|r| r.record_id != record_id);
                self.notify(NotificationLevel::Success, "Record successfully finalized.".into());
            }
            Err(e) => self.notify_finalize_failed(e),
        }
        result
    }

    /// Complete finalizes that were interrupted between their two writes.
    pub fn resume_pending_finalizations(&mut self) -> DbResult<ResumeSummary> {
        let summary = Finalizer::new(&self.store).resume_all()?;

        self.records
            .retain(|r| !summary.completed.contains(&r.record_id));
        for (_, error) in &summary.failed {
            self.notify_finalize_failed(error);
        }
        Ok(summary)
    }

    fn notify_finalize_failed(&mut self, error: &FinalizeError) {
        warn!(error = %error, "finalize failed");
        self.notify(
            NotificationLevel::Error,
            format!("Failed to finalize the record. Error: {}", error),
        );
    }

    // =========================================================================
    // Other views
    // =========================================================================

    /// Records of the historical collection, for the historical-data view.
    pub fn list_historical(&self) -> DbResult<Vec<HistoricalRecord>> {
        self.store.list_historical()
    }

    /// Route for a navigation button.
    pub fn navigate(&self, target: NavigationTarget) -> &'static str {
        info!(route = target.route(), "navigation requested");
        target.route()
    }

    fn notify(&mut self, level: NotificationLevel, message: String) {
        self.notifications.push(Notification { level, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::{Duration, TimeZone, Utc};

    fn config() -> DashboardConfig {
        DashboardConfig {
            utc_offset_minutes: 0,
            ..Default::default()
        }
    }

    fn setup_dashboard(count: usize) -> Dashboard<Database> {
        let db = Database::open_in_memory().unwrap();
        for i in 0..count {
            let mut fields = AppointmentFields::new(format!("R{:03}", i), format!("Patient {}", i));
            let base = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
            fields.appointment_date = Some(base + Duration::days(i as i64));
            db.insert_active(&fields).unwrap();
        }
        let mut dashboard = Dashboard::new(db, config());
        assert!(dashboard.mount());
        dashboard
    }

    #[test]
    fn test_mount_loads_newest_first() {
        let dashboard = setup_dashboard(3);
        let regs: Vec<&str> = dashboard
            .records()
            .iter()
            .map(|r| r.fields.registration_number.as_str())
            .collect();
        assert_eq!(regs, vec!["R002", "R001", "R000"]);
        assert!(dashboard.banner().is_none());
    }

    #[test]
    fn test_visible_records_follow_page() {
        let mut dashboard = setup_dashboard(25);
        assert_eq!(dashboard.visible_records().len(), 10);

        dashboard.next_page();
        let info = dashboard.next_page();
        assert_eq!(info.current, 3);
        assert!(!info.has_next);
        assert_eq!(dashboard.visible_records().len(), 5);
    }

    #[test]
    fn test_page_is_sticky_by_default() {
        let mut dashboard = setup_dashboard(25);
        dashboard.go_to_page(3);

        let criteria = SearchCriteria {
            registration_number: Some("R004".into()),
            ..Default::default()
        };
        assert!(dashboard.load_active(&criteria));
        assert_eq!(dashboard.records().len(), 1);
        assert_eq!(dashboard.page_info().current, 3);
        assert!(dashboard.visible_records().is_empty());
    }

    #[test]
    fn test_page_resets_when_configured() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..25 {
            db.insert_active(&AppointmentFields::new(format!("R{}", i), "P".into()))
                .unwrap();
        }
        let mut dashboard = Dashboard::new(
            db,
            DashboardConfig {
                reset_page_on_new_results: true,
                ..config()
            },
        );
        dashboard.load_all();
        dashboard.go_to_page(3);

        dashboard.sort_by(RecordField::RegistrationNumber);
        assert_eq!(dashboard.page_info().current, 1);
    }

    #[test]
    fn test_sort_by_updates_records_and_state() {
        let mut dashboard = setup_dashboard(3);
        let state = dashboard.sort_by(RecordField::RegistrationNumber);
        assert_eq!(state.direction, SortDirection::Ascending);
        assert_eq!(dashboard.records()[0].fields.registration_number, "R000");

        let state = dashboard.sort_by(RecordField::RegistrationNumber);
        assert_eq!(state.direction, SortDirection::Descending);
        assert_eq!(dashboard.records()[0].fields.registration_number, "R002");
    }

    #[test]
    fn test_set_field_unknown_record() {
        let mut dashboard = setup_dashboard(1);
        let result = dashboard.set_field("nope", RecordField::Remarks, FieldInput::Text("x".into()));
        assert!(matches!(result, Err(EditError::UnknownRecord(_))));
    }

    #[test]
    fn test_save_record_persists_and_notifies() {
        let mut dashboard = setup_dashboard(1);
        let record_id = dashboard.records()[0].record_id.clone();

        dashboard
            .set_field(&record_id, RecordField::Remarks, FieldInput::Text("Call back".into()))
            .unwrap();
        let saved = dashboard.save_record(&record_id).unwrap();
        assert_eq!(saved.fields.remarks, "Call back");

        let stored = dashboard.store().get_active(&record_id).unwrap().unwrap();
        assert_eq!(stored.fields.remarks, "Call back");

        let notifications = dashboard.take_notifications();
        assert_eq!(
            notifications,
            vec![Notification {
                level: NotificationLevel::Success,
                message: "Record updated successfully!".into(),
            }]
        );
        assert!(dashboard.take_notifications().is_empty());
    }

    #[test]
    fn test_finalize_unknown_record_notifies() {
        let mut dashboard = setup_dashboard(1);
        let result = dashboard.finalize("nope");
        assert!(matches!(result, Err(FinalizeError::NotFound(_))));

        let notifications = dashboard.take_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].level, NotificationLevel::Error);
    }

    #[test]
    fn test_navigate_routes() {
        let dashboard = setup_dashboard(0);
        assert_eq!(dashboard.navigate(NavigationTarget::HistoricalData), "/finalData");
        assert_eq!(dashboard.navigate(NavigationTarget::RegisteredUsers), "/registered-users-data");
        assert_eq!(dashboard.navigate(NavigationTarget::BookAppointment), "/login");
    }
}
