//! Remote calendar access.
//!
//! `CalendarProvider` is the seam between the orchestrator and the network:
//! `GoogleCalendarClient` talks to the real API, tests plug in fakes.

pub mod google;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::date_range::SyncWindow;
use crate::error::CalendarResult;

pub use google::GoogleCalendarClient;

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Events inside the window, in whatever order the provider returns them.
    async fn list_events(&self, window: &SyncWindow) -> CalendarResult<Vec<RawEvent>>;

    /// Create one event. A failed attempt is returned as-is, never retried.
    async fn create_event(&self, draft: &RawEventDraft) -> CalendarResult<RawEvent>;

    /// Whether the current credential is accepted by the provider.
    async fn check_connection(&self) -> CalendarResult<bool>;
}

/// An event as Google Calendar returns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start: EventDateTime,
    #[serde(default)]
    pub end: EventDateTime,
}

/// Either `dateTime` (timed event) or `date` (all-day event) is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Body of an event insert request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventDraft {
    pub summary: String,
    pub description: String,
    pub start: DraftDateTime,
    pub end: DraftDateTime,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftDateTime {
    pub date_time: String,
    pub time_zone: String,
}
