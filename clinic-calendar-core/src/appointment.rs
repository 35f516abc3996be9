//! Appointment types shared by the store, the transformer and the server.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, CalendarResult};

/// Color hint for appointments created in the dashboard
pub const DEFAULT_LOCAL_COLOR: &str = "pink";
/// Color hint for appointments imported from Google Calendar
pub const EXTERNAL_COLOR: &str = "blue";

/// Prefix for ids of appointments created in the dashboard
pub const LOCAL_ID_PREFIX: &str = "local-";
/// Prefix for ids derived from a Google Calendar event id
pub const EXTERNAL_ID_PREFIX: &str = "google-";

/// Where an appointment originated. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Local,
    External,
}

/// A calendar entry as the dashboard shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub title: String,
    pub client_name: String,
    pub employee_name: String,
    pub date: NaiveDate,
    #[serde(with = "hh_mm")]
    pub time: NaiveTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    pub source: Source,
    pub color_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Google event id, for imported appointments and successful mirrors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_event_id: Option<String>,
}

impl Appointment {
    /// Build a new local appointment from a validated form draft.
    pub fn local(draft: &AppointmentDraft) -> CalendarResult<Self> {
        let (date, time) = draft.validate()?;

        Ok(Appointment {
            id: format!("{}{}", LOCAL_ID_PREFIX, uuid::Uuid::new_v4()),
            title: draft.title.trim().to_string(),
            client_name: draft.client_name.trim().to_string(),
            employee_name: draft.employee_name.trim().to_string(),
            date,
            time,
            duration_minutes: draft.duration_minutes,
            source: Source::Local,
            color_tag: draft
                .color_tag
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCAL_COLOR.to_string()),
            description: non_blank(draft.description.as_deref()),
            location: non_blank(draft.location.as_deref()),
            remote_event_id: None,
        })
    }

    pub fn is_external(&self) -> bool {
        self.source == Source::External
    }

    /// Overwrite the editable fields from a draft, keeping id and source.
    pub fn apply(&mut self, draft: &AppointmentDraft) -> CalendarResult<()> {
        let (date, time) = draft.validate()?;

        self.title = draft.title.trim().to_string();
        self.client_name = draft.client_name.trim().to_string();
        self.employee_name = draft.employee_name.trim().to_string();
        self.date = date;
        self.time = time;
        self.duration_minutes = draft.duration_minutes;
        if let Some(color) = &draft.color_tag {
            self.color_tag = color.clone();
        }
        self.description = non_blank(draft.description.as_deref());
        self.location = non_blank(draft.location.as_deref());
        Ok(())
    }
}

/// The appointment form as submitted by the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub employee_name: String,
    /// YYYY-MM-DD
    #[serde(default)]
    pub date: String,
    /// HH:MM
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub color_tag: Option<String>,
}

impl AppointmentDraft {
    /// Check the required fields and parse date and time.
    pub fn validate(&self) -> CalendarResult<(NaiveDate, NaiveTime)> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.date.trim().is_empty() {
            missing.push("date");
        }
        if self.time.trim().is_empty() {
            missing.push("time");
        }
        if !missing.is_empty() {
            return Err(CalendarError::Validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").map_err(|_| {
            CalendarError::Validation(format!(
                "invalid date '{}'. Expected YYYY-MM-DD",
                self.date
            ))
        })?;
        let time = NaiveTime::parse_from_str(self.time.trim(), "%H:%M").map_err(|_| {
            CalendarError::Validation(format!("invalid time '{}'. Expected HH:MM", self.time))
        })?;

        Ok((date, time))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Serialize wall-clock times as "HH:MM".
pub mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}
