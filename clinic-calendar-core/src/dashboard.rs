//! Wires the calendar pieces together for one running dashboard.

use std::sync::Arc;

use crate::auth::{AuthorizationFlow, OAuthClient};
use crate::connection::ConnectionManager;
use crate::error::CalendarResult;
use crate::notify::NotificationFeed;
use crate::orchestrator::SyncOrchestrator;
use crate::remote::{CalendarProvider, GoogleCalendarClient};
use crate::session::Session;
use crate::settings::{GoogleSettings, SyncSettings};
use crate::store::{AppointmentStore, SharedStore};

pub struct Dashboard {
    store: SharedStore,
    session: Session,
    feed: NotificationFeed,
    connection: Arc<ConnectionManager>,
    orchestrator: Arc<SyncOrchestrator>,
}

impl Dashboard {
    /// Build a dashboard backed by the real Google endpoints.
    pub fn mount(google: &GoogleSettings, sync: SyncSettings) -> CalendarResult<Self> {
        let session = Session::new();
        let provider = GoogleCalendarClient::new(google, &sync, Arc::new(session.clone()))?;
        let flow = OAuthClient::new(google.clone(), &sync)?;

        Self::with_parts(Arc::new(provider), Arc::new(flow), session, sync)
    }

    /// Build a dashboard from explicit collaborators.
    pub fn with_parts(
        provider: Arc<dyn CalendarProvider>,
        flow: Arc<dyn AuthorizationFlow>,
        session: Session,
        sync: SyncSettings,
    ) -> CalendarResult<Self> {
        let store = AppointmentStore::new().shared();
        let feed = NotificationFeed::new();
        let connection = Arc::new(ConnectionManager::new(provider.clone(), flow, session.clone()));
        let orchestrator = SyncOrchestrator::new(
            provider,
            connection.clone(),
            store.clone(),
            Arc::new(feed.clone()),
            sync,
        )?;

        Ok(Dashboard {
            store,
            session,
            feed,
            connection,
            orchestrator: Arc::new(orchestrator),
        })
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn notifications(&self) -> &NotificationFeed {
        &self.feed
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    pub fn orchestrator(&self) -> &Arc<SyncOrchestrator> {
        &self.orchestrator
    }
}
