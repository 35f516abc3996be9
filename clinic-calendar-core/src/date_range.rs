//! Time window for pulling events.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::error::{CalendarError, CalendarResult};

/// Closed time window `[from, to]` passed to the provider as timeMin/timeMax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl SyncWindow {
    pub fn next_days(days: i64) -> CalendarResult<Self> {
        SyncWindow::starting_at(Utc::now(), days)
    }

    /// `days` must be positive and small enough to stay within chrono's range.
    pub fn starting_at(from: DateTime<Utc>, days: i64) -> CalendarResult<Self> {
        let to = Duration::try_days(days)
            .filter(|_| days > 0)
            .and_then(|span| from.checked_add_signed(span))
            .ok_or_else(|| CalendarError::Config(format!("invalid sync window of {} days", days)))?;

        Ok(SyncWindow { from, to })
    }

    pub fn time_min(&self) -> String {
        self.from.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn time_max(&self) -> String {
        self.to.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}
