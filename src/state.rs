use std::sync::Arc;

use clinic_calendar_core::Dashboard;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    dashboard: Arc<Dashboard>,
}

impl AppState {
    pub fn new(dashboard: Dashboard) -> Self {
        AppState {
            dashboard: Arc::new(dashboard),
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }
}
