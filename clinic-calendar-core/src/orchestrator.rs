//! Sync orchestration: connect, pull, transform, merge, notify.
//!
//! Phases move `idle → connecting|syncing → success|error → idle`. The
//! success and error phases stay visible for `status_display` and then fall
//! back to idle unless something newer has happened in the meantime.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

use crate::appointment::{Appointment, AppointmentDraft};
use crate::connection::{ConnectionManager, PendingAuthorization, SUPERSEDED};
use crate::date_range::SyncWindow;
use crate::error::{CalendarError, CalendarResult};
use crate::notify::{Notification, Notifier};
use crate::remote::CalendarProvider;
use crate::settings::SyncSettings;
use crate::store::SharedStore;
use crate::transform::{to_draft, transform_all};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "message", rename_all = "lowercase")]
pub enum SyncPhase {
    Idle,
    Connecting,
    Syncing,
    Success,
    Error(String),
}

/// Current phase plus a counter bumped on every transition, so a delayed
/// revert can tell whether it is still the latest word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseState {
    pub generation: u64,
    #[serde(flatten)]
    pub phase: SyncPhase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub imported: usize,
    /// Events Google returned that could not be placed on the calendar
    pub skipped: usize,
    pub removed: usize,
    pub finished_at: DateTime<Utc>,
}

/// Result of creating a local appointment and pushing it to Google.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorOutcome {
    pub appointment: Appointment,
    pub mirrored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_error: Option<String>,
}

pub struct SyncOrchestrator {
    provider: Arc<dyn CalendarProvider>,
    connection: Arc<ConnectionManager>,
    store: SharedStore,
    notifier: Arc<dyn Notifier>,
    settings: SyncSettings,
    offset: FixedOffset,
    phase: Arc<watch::Sender<PhaseState>>,
    syncing: AtomicBool,
    last_sync: RwLock<Option<DateTime<Utc>>>,
}

/// Clears the in-flight flag when a sync ends, however it ends.
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncOrchestrator {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        connection: Arc<ConnectionManager>,
        store: SharedStore,
        notifier: Arc<dyn Notifier>,
        settings: SyncSettings,
    ) -> CalendarResult<Self> {
        settings.validate()?;
        let offset = settings.offset()?;

        Ok(SyncOrchestrator {
            provider,
            connection,
            store,
            notifier,
            settings,
            offset,
            phase: Arc::new(watch::Sender::new(PhaseState {
                generation: 0,
                phase: SyncPhase::Idle,
            })),
            syncing: AtomicBool::new(false),
            last_sync: RwLock::new(None),
        })
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase.borrow().phase.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PhaseState> {
        self.phase.subscribe()
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.read().await
    }

    pub async fn check_connection(&self) -> bool {
        self.connection.check_connection().await
    }

    // SYNC:

    /// Pull the next `window_days` of events and replace the external partition.
    ///
    /// Either the whole fetched batch replaces the previous one or, on error,
    /// the store is left untouched. Events without a start are skipped and
    /// counted in the report. A disconnect while the request is out discards
    /// the batch.
    pub async fn sync(&self) -> CalendarResult<SyncReport> {
        let _in_flight = self.begin_sync()?;
        let _loading = self.connection.loading();
        let epoch = self.connection.epoch();

        let window = match SyncWindow::next_days(self.settings.window_days) {
            Ok(window) => window,
            Err(e) => return Err(self.fail_sync(e)),
        };
        info!(from = %window.time_min(), to = %window.time_max(), "starting Google Calendar sync");

        let events = match self.provider.list_events(&window).await {
            Ok(events) => events,
            Err(e) => return Err(self.fail_sync(e)),
        };

        let batch = transform_all(&events, self.offset);
        let imported = batch.len();
        let skipped = events.len() - imported;

        let stats = {
            let mut store = self.store.write().await;
            if self.connection.epoch() != epoch {
                drop(store);
                return Err(self.fail_sync(CalendarError::Auth(
                    "disconnected while syncing".into(),
                )));
            }
            store.replace_external(batch)
        };

        let finished_at = Utc::now();
        *self.last_sync.write().await = Some(finished_at);

        info!(imported, skipped, removed = stats.removed, "Google Calendar sync finished");
        self.notifier.notify(Notification::info(
            "Events synced!",
            match skipped {
                0 => format!("{} events imported from Google Calendar.", imported),
                _ => format!(
                    "{} events imported from Google Calendar, {} skipped.",
                    imported, skipped
                ),
            },
        ));
        self.settle(SyncPhase::Success);

        Ok(SyncReport {
            imported,
            skipped,
            removed: stats.removed,
            finished_at,
        })
    }

    // LOCAL APPOINTMENTS:

    /// Insert a local appointment, then try to mirror it to Google.
    ///
    /// Validation happens before anything else. Once inserted, the local
    /// record stays whether or not the mirror succeeds.
    pub async fn create_and_mirror(&self, draft: &AppointmentDraft) -> CalendarResult<MirrorOutcome> {
        let mut appointment = Appointment::local(draft)?;
        let body = to_draft(&appointment, self.offset, &self.settings.time_zone)?;
        let _loading = self.connection.loading();

        self.store.write().await.insert_local(appointment.clone());
        self.notifier.notify(Notification::info(
            "Appointment created!",
            "The appointment was added to the calendar.",
        ));

        match self.provider.create_event(&body).await {
            Ok(created) => {
                if let Err(e) = self
                    .store
                    .write()
                    .await
                    .set_remote_event_id(&appointment.id, created.id.clone())
                {
                    debug!(id = %appointment.id, error = %e, "appointment changed before mirror finished");
                }
                appointment.remote_event_id = Some(created.id);

                self.notifier.notify(Notification::info(
                    "Event created!",
                    "The event was added to Google Calendar.",
                ));
                Ok(MirrorOutcome {
                    appointment,
                    mirrored: true,
                    mirror_error: None,
                })
            }
            Err(e) => {
                warn!(id = %appointment.id, error = %e, "could not mirror appointment to Google Calendar");
                self.notifier.notify(Notification::error(
                    "Could not add event to Google Calendar",
                    user_message(&e),
                ));
                Ok(MirrorOutcome {
                    appointment,
                    mirrored: false,
                    mirror_error: Some(e.to_string()),
                })
            }
        }
    }

    pub async fn update_local(&self, id: &str, draft: &AppointmentDraft) -> CalendarResult<Appointment> {
        let updated = self.store.write().await.update_local(id, draft)?;
        self.notifier.notify(Notification::info(
            "Appointment updated!",
            "The appointment was saved.",
        ));
        Ok(updated)
    }

    pub async fn delete_local(&self, id: &str) -> CalendarResult<Appointment> {
        let deleted = self.store.write().await.delete_local(id)?;
        self.notifier.notify(Notification::info(
            "Appointment deleted!",
            "The appointment was removed from the calendar.",
        ));
        Ok(deleted)
    }

    // CONNECTION:

    /// Start the consent handshake. Pass the returned handle to `finish_connect`.
    pub fn connect(&self) -> CalendarResult<PendingAuthorization> {
        self.transition(SyncPhase::Connecting);

        match self.connection.connect() {
            Ok(pending) => Ok(pending),
            Err(e) => {
                self.notifier
                    .notify(Notification::error("Could not connect", e.to_string()));
                self.settle(SyncPhase::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Wait for the OAuth callback to resolve a handshake and report the outcome.
    ///
    /// Gives up after `connect_timeout`. A handshake replaced by a newer
    /// connect ends quietly so it does not clobber the newer one's phase.
    pub async fn finish_connect(&self, pending: PendingAuthorization) -> CalendarResult<()> {
        let outcome = tokio::time::timeout(self.settings.connect_timeout(), pending.completed())
            .await
            .unwrap_or_else(|_| {
                Err(CalendarError::Auth(
                    "timed out waiting for Google authorization".into(),
                ))
            });

        match outcome {
            Err(e) if matches!(&e, CalendarError::Auth(reason) if reason == SUPERSEDED) => {
                debug!("authorization handshake replaced by a newer connect");
                Err(e)
            }
            Ok(()) => {
                self.notifier.notify(Notification::info(
                    "Google Calendar connected!",
                    "You can now sync your events.",
                ));
                self.settle(SyncPhase::Success);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Google Calendar connect failed");
                self.notifier
                    .notify(Notification::error("Could not connect", e.to_string()));
                self.settle(SyncPhase::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Drop the credential and every appointment that came from Google.
    pub async fn disconnect(&self) -> usize {
        self.connection.disconnect().await;
        let removed = self.store.write().await.clear_external();
        *self.last_sync.write().await = None;

        self.notifier.notify(Notification::info(
            "Google Calendar disconnected",
            format!("{} imported events removed.", removed),
        ));
        self.transition(SyncPhase::Idle);
        removed
    }

    // PHASES:

    /// Mark a sync in flight and move to `syncing`, unless one is already running.
    fn begin_sync(&self) -> CalendarResult<SyncGuard<'_>> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("sync requested while another is in flight");
            return Err(CalendarError::AlreadySyncing);
        }

        self.transition(SyncPhase::Syncing);
        Ok(SyncGuard(&self.syncing))
    }

    fn fail_sync(&self, err: CalendarError) -> CalendarError {
        warn!(error = %err, "Google Calendar sync failed");
        self.notifier
            .notify(Notification::error("Sync failed", user_message(&err)));
        self.settle(SyncPhase::Error(err.to_string()));
        err
    }

    fn transition(&self, phase: SyncPhase) -> u64 {
        let mut generation = 0;
        self.phase.send_modify(|state| {
            state.generation += 1;
            state.phase = phase;
            generation = state.generation;
        });
        generation
    }

    /// Show a terminal phase, then return to idle after the display delay.
    fn settle(&self, phase: SyncPhase) {
        let generation = self.transition(phase);
        let sender = self.phase.clone();
        let delay = self.settings.status_display();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sender.send_if_modified(|state| {
                if state.generation != generation {
                    return false;
                }
                state.generation += 1;
                state.phase = SyncPhase::Idle;
                true
            });
        });
    }
}

fn user_message(err: &CalendarError) -> String {
    match err {
        CalendarError::Auth(_) => "Please connect your Google Calendar first.".to_string(),
        other => other.to_string(),
    }
}
