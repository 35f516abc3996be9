//! Settings for the Google Calendar integration.
//!
//! These are deserialized from the `[google]` and `[sync]` tables of the
//! server's config.toml. Everything except the OAuth client credentials has
//! a default.

use std::time::Duration;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, CalendarResult};

/// Google's alias for the user's main calendar
pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Number of days ahead of now that a sync pulls
pub const DEFAULT_WINDOW_DAYS: i64 = 30;
/// Google rejects wider ranges long before this, but it keeps the arithmetic sane
pub const MAX_WINDOW_DAYS: i64 = 366;
/// How long success/error stays visible before the status returns to idle
pub const DEFAULT_STATUS_DISPLAY_SECS: u64 = 3;
/// The clinic runs on São Paulo time, which has no DST since 2019
/// How long a started connect waits for the OAuth callback
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_UTC_OFFSET: &str = "-03:00";
pub const DEFAULT_TIME_ZONE: &str = "America/Sao_Paulo";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Where Google sends the user back after consent (the server's /auth/callback)
    pub redirect_uri: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

impl GoogleSettings {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        GoogleSettings {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            calendar_id: default_calendar_id(),
            api_base_url: default_api_base_url(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    #[serde(default = "default_status_display_secs")]
    pub status_display_secs: u64,
    /// Fixed offset used to split provider timestamps into date and time
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    /// IANA name sent along with mirrored events
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// Overall timeout for provider requests; the transport default applies when unset
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            window_days: default_window_days(),
            status_display_secs: default_status_display_secs(),
            utc_offset: default_utc_offset(),
            time_zone: default_time_zone(),
            request_timeout_secs: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl SyncSettings {
    pub fn offset(&self) -> CalendarResult<FixedOffset> {
        self.utc_offset.parse::<FixedOffset>().map_err(|_| {
            CalendarError::Config(format!(
                "invalid utc_offset '{}'. Expected something like -03:00",
                self.utc_offset
            ))
        })
    }

    /// Check everything that can only be wrong at runtime.
    pub fn validate(&self) -> CalendarResult<()> {
        self.offset()?;

        if !(1..=MAX_WINDOW_DAYS).contains(&self.window_days) {
            return Err(CalendarError::Config(format!(
                "window_days must be between 1 and {}, got {}",
                MAX_WINDOW_DAYS, self.window_days
            )));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn status_display(&self) -> Duration {
        Duration::from_secs(self.status_display_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn default_calendar_id() -> String {
    DEFAULT_CALENDAR_ID.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_auth_url() -> String {
    DEFAULT_AUTH_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_window_days() -> i64 {
    DEFAULT_WINDOW_DAYS
}

fn default_status_display_secs() -> u64 {
    DEFAULT_STATUS_DISPLAY_SECS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_utc_offset() -> String {
    DEFAULT_UTC_OFFSET.to_string()
}

fn default_time_zone() -> String {
    DEFAULT_TIME_ZONE.to_string()
}
