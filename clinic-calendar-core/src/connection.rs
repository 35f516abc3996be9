//! Connection state for the Google Calendar integration.
//!
//! A connect is a redirect handshake: `connect` hands out the consent URL and
//! a single-fire completion, and the OAuth callback later resolves it through
//! `complete_authorization`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tracing::{info, warn};

use crate::auth::AuthorizationFlow;
use crate::error::{CalendarError, CalendarResult};
use crate::remote::CalendarProvider;
use crate::session::Session;

/// Reason given to a handshake replaced by a newer connect
pub const SUPERSEDED: &str = "superseded by a newer connect";

type Completion = oneshot::Sender<CalendarResult<()>>;
type Registry = Arc<Mutex<HashMap<String, Completion>>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub is_loading: bool,
    pub is_connected: bool,
}

pub struct ConnectionManager {
    provider: Arc<dyn CalendarProvider>,
    flow: Arc<dyn AuthorizationFlow>,
    session: Session,
    status: watch::Sender<ConnectionStatus>,
    pending: Registry,
    in_flight: AtomicUsize,
    epoch: AtomicU64,
}

/// Keeps `is_loading` set while an operation is in flight.
pub(crate) struct LoadingGuard<'a> {
    manager: &'a ConnectionManager,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let in_flight = &self.manager.in_flight;
        self.manager.status.send_modify(|s| {
            s.is_loading = in_flight.fetch_sub(1, Ordering::SeqCst) > 1;
        });
    }
}

/// An outstanding handshake. Dropping it unregisters the completion.
pub struct PendingAuthorization {
    pub authorization_url: String,
    pub state: String,
    completion: oneshot::Receiver<CalendarResult<()>>,
    registry: Registry,
}

impl PendingAuthorization {
    /// Wait for the callback to complete or fail this handshake.
    pub async fn completed(mut self) -> CalendarResult<()> {
        match (&mut self.completion).await {
            Ok(result) => result,
            Err(_) => Err(CalendarError::Auth("authorization was cancelled".into())),
        }
    }
}

impl Drop for PendingAuthorization {
    fn drop(&mut self) {
        lock(&self.registry).remove(&self.state);
    }
}

impl ConnectionManager {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        flow: Arc<dyn AuthorizationFlow>,
        session: Session,
    ) -> Self {
        ConnectionManager {
            provider,
            flow,
            session,
            status: watch::Sender::new(ConnectionStatus::default()),
            pending: Arc::default(),
            in_flight: AtomicUsize::new(0),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected
    }

    /// Bumped by every disconnect.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub(crate) fn loading(&self) -> LoadingGuard<'_> {
        let in_flight = &self.in_flight;
        self.status.send_modify(|s| {
            in_flight.fetch_add(1, Ordering::SeqCst);
            s.is_loading = true;
        });
        LoadingGuard { manager: self }
    }

    /// Validate the stored credential against the provider.
    ///
    /// Never fails: a missing credential, a network error or a rejected token
    /// all read as "not connected".
    pub async fn check_connection(&self) -> bool {
        let _loading = self.loading();

        let connected = match self.provider.check_connection().await {
            Ok(connected) => connected,
            Err(CalendarError::Auth(_)) => false,
            Err(e) => {
                warn!(error = %e, "Google Calendar connection check failed");
                false
            }
        };

        self.status.send_modify(|s| s.is_connected = connected);
        connected
    }

    /// Start a redirect handshake, replacing any that is still outstanding.
    pub fn connect(&self) -> CalendarResult<PendingAuthorization> {
        let state = uuid::Uuid::new_v4().simple().to_string();
        let authorization_url = self.flow.authorization_url(&state)?;

        let (tx, rx) = oneshot::channel();
        let mut pending = lock(&self.pending);
        for (_, earlier) in pending.drain() {
            let _ = earlier.send(Err(CalendarError::Auth(SUPERSEDED.into())));
        }
        pending.insert(state.clone(), tx);
        drop(pending);

        Ok(PendingAuthorization {
            authorization_url,
            state,
            completion: rx,
            registry: self.pending.clone(),
        })
    }

    /// Finish the handshake identified by `state` with the code Google returned.
    pub async fn complete_authorization(&self, state: &str, code: &str) -> CalendarResult<()> {
        let completion = self.take_pending(state)?;

        let _loading = self.loading();
        let result = self.flow.exchange_code(code).await;
        let connected = result.is_ok();

        if let Ok(ref credential) = result {
            self.session.store(credential.clone()).await;
            info!("Google Calendar connected");
        }
        self.status.send_modify(|s| s.is_connected = s.is_connected || connected);

        let outcome = result.map(|_| ());
        let _ = completion.send(match &outcome {
            Ok(()) => Ok(()),
            Err(e) => Err(CalendarError::Auth(e.to_string())),
        });
        outcome
    }

    /// Resolve a handshake as failed, e.g. when the user denied consent.
    pub fn fail_authorization(&self, state: &str, reason: &str) -> CalendarResult<()> {
        let completion = self.take_pending(state)?;
        let _ = completion.send(Err(CalendarError::Auth(reason.to_string())));
        Ok(())
    }

    /// Drop a pending handshake without resolving it.
    pub fn cancel(&self, state: &str) -> bool {
        lock(&self.pending).remove(state).is_some()
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Forget the credential and any handshake still in flight.
    pub async fn disconnect(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.session.clear().await;
        lock(&self.pending).clear();
        self.status.send_modify(|s| s.is_connected = false);
        info!("Google Calendar disconnected");
    }

    fn take_pending(&self, state: &str) -> CalendarResult<Completion> {
        lock(&self.pending)
            .remove(state)
            .ok_or_else(|| CalendarError::Auth("unknown or expired authorization state".into()))
    }
}

fn lock(registry: &Registry) -> std::sync::MutexGuard<'_, HashMap<String, Completion>> {
    registry.lock().unwrap_or_else(|e| e.into_inner())
}
