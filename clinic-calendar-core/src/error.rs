//! Error types for the clinic calendar.

use thiserror::Error;

/// Errors that can occur in calendar operations.
#[derive(Error, Debug)]
pub enum CalendarError {
    /// No valid provider credential for the current session.
    #[error("Not connected to Google Calendar: {0}")]
    Auth(String),

    /// The provider answered with a non-success status.
    #[error("Google Calendar error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// Required form fields are missing or malformed.
    #[error("Invalid appointment: {0}")]
    Validation(String),

    /// The request never got a response (DNS, connection refused, TLS...).
    #[error("Request to Google Calendar failed: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("A sync is already in progress")]
    AlreadySyncing,

    #[error("Appointment not found: {0}")]
    NotFound(String),

    /// External-origin appointments can only change through a sync.
    #[error("Appointment '{0}' comes from Google Calendar and is read-only")]
    ReadOnly(String),
}

impl From<reqwest::Error> for CalendarError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CalendarError::Serialization(err.to_string())
        } else {
            CalendarError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CalendarError {
    fn from(err: serde_json::Error) -> Self {
        CalendarError::Serialization(err.to_string())
    }
}

/// Result type alias for calendar operations.
pub type CalendarResult<T> = Result<T, CalendarError>;
