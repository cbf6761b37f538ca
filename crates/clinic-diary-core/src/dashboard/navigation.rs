//! Views the dashboard links to. Rendering them is up to the host.

/// A navigation destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTarget {
    /// Registered-users listing
    RegisteredUsers,
    /// Historical (finalized) records listing
    HistoricalData,
    /// Login / booking entry point
    BookAppointment,
}

impl NavigationTarget {
    /// Route the host should navigate to.
    pub fn route(&self) -> &'static str {
        match self {
            NavigationTarget::RegisteredUsers => "/registered-users-data",
            NavigationTarget::HistoricalData => "/finalData",
            NavigationTarget::BookAppointment => "/login",
        }
    }
}
