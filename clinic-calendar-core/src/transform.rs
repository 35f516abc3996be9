//! Conversion between Google events and dashboard appointments.
//!
//! Timestamps are split into date and wall-clock time at a single fixed UTC
//! offset. There is no per-event time zone negotiation.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone};
use tracing::warn;

use crate::appointment::{Appointment, EXTERNAL_COLOR, EXTERNAL_ID_PREFIX, Source};
use crate::error::{CalendarError, CalendarResult};
use crate::remote::{DraftDateTime, EventDateTime, RawEvent, RawEventDraft};

/// Title shown for events without a summary
pub const UNTITLED_EVENT: &str = "Untitled event";

const CLIENT_LABELS: &[&str] = &["Cliente:", "Client:"];
const EMPLOYEE_LABELS: &[&str] = &["Profissional:", "Employee:"];

/// Map a Google event to an external appointment.
///
/// Deterministic: the id is derived from the Google event id, so the same
/// event always yields the same appointment.
pub fn transform(event: &RawEvent, offset: FixedOffset) -> CalendarResult<Appointment> {
    let start = parse_event_time(&event.start, offset).ok_or_else(|| {
        CalendarError::Serialization(format!("event '{}' has no usable start time", event.id))
    })?;
    let end = parse_event_time(&event.end, offset);

    let duration_minutes = match (start, end) {
        (EventTime::Timed(s), Some(EventTime::Timed(e))) if e > s => {
            u32::try_from((e - s).num_minutes()).ok()
        }
        _ => None,
    };

    let start = start.naive();
    let description = event
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let (client_name, employee_name) = description.map(parse_people).unwrap_or_default();

    Ok(Appointment {
        id: format!("{}{}", EXTERNAL_ID_PREFIX, event.id),
        title: event
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNTITLED_EVENT)
            .to_string(),
        client_name,
        employee_name,
        date: start.date(),
        time: start.time(),
        duration_minutes,
        source: Source::External,
        color_tag: EXTERNAL_COLOR.to_string(),
        description: description.map(String::from),
        location: event
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from),
        remote_event_id: Some(event.id.clone()),
    })
}

/// Transform a whole batch, skipping events that cannot be placed on the calendar.
pub fn transform_all(events: &[RawEvent], offset: FixedOffset) -> Vec<Appointment> {
    events
        .iter()
        .filter_map(|event| match transform(event, offset) {
            Ok(appointment) => Some(appointment),
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "skipping Google event");
                None
            }
        })
        .collect()
}

/// Build the Google insert body for a local appointment.
pub fn to_draft(
    appointment: &Appointment,
    offset: FixedOffset,
    time_zone: &str,
) -> CalendarResult<RawEventDraft> {
    let naive = appointment.date.and_time(appointment.time);
    let start = offset.from_local_datetime(&naive).single().ok_or_else(|| {
        CalendarError::Validation(format!("cannot place {} at offset {}", naive, offset))
    })?;
    let end = match appointment.duration_minutes {
        Some(minutes) => start + chrono::Duration::minutes(i64::from(minutes)),
        None => start,
    };

    let description = appointment.description.clone().unwrap_or_else(|| {
        format!(
            "{} {}\n{} {}",
            CLIENT_LABELS[0], appointment.client_name, EMPLOYEE_LABELS[0], appointment.employee_name
        )
    });

    Ok(RawEventDraft {
        summary: appointment.title.clone(),
        description,
        start: draft_time(start, time_zone),
        end: draft_time(end, time_zone),
        location: appointment.location.clone().unwrap_or_default(),
    })
}

fn draft_time(at: DateTime<FixedOffset>, time_zone: &str) -> DraftDateTime {
    DraftDateTime {
        date_time: at.to_rfc3339_opts(SecondsFormat::Secs, false),
        time_zone: time_zone.to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
enum EventTime {
    /// Wall-clock time at the configured offset
    Timed(NaiveDateTime),
    AllDay(NaiveDate),
}

impl EventTime {
    fn naive(self) -> NaiveDateTime {
        match self {
            EventTime::Timed(dt) => dt,
            EventTime::AllDay(d) => d.and_time(NaiveTime::default()),
        }
    }
}

fn parse_event_time(time: &EventDateTime, offset: FixedOffset) -> Option<EventTime> {
    if let Some(ref s) = time.date_time {
        // With an explicit offset, move to ours; without one it is already wall-clock
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(EventTime::Timed(dt.with_timezone(&offset).naive_local()));
        }
        return ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(EventTime::Timed);
    }

    time.date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .map(EventTime::AllDay)
}

/// Pull client and employee names out of "Cliente: ...\nProfissional: ..." lines.
fn parse_people(description: &str) -> (String, String) {
    let mut client = String::new();
    let mut employee = String::new();

    for line in description.lines().map(str::trim) {
        if let Some(name) = strip_label(line, CLIENT_LABELS) {
            client = name;
        } else if let Some(name) = strip_label(line, EMPLOYEE_LABELS) {
            employee = name;
        }
    }

    (client, employee)
}

fn strip_label(line: &str, labels: &[&str]) -> Option<String> {
    labels
        .iter()
        .find_map(|label| line.strip_prefix(label))
        .map(|rest| rest.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::AppointmentDraft;

    fn sao_paulo() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    fn timed(id: &str, summary: Option<&str>, start: &str, end: &str) -> RawEvent {
        RawEvent {
            id: id.to_string(),
            summary: summary.map(String::from),
            start: EventDateTime {
                date_time: Some(start.to_string()),
                ..Default::default()
            },
            end: EventDateTime {
                date_time: Some(end.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_naive_timestamp_is_split_as_is() {
        let event = timed("1", Some("Reunião"), "2024-03-15T10:00:00", "2024-03-15T11:00:00");
        let appointment = transform(&event, sao_paulo()).unwrap();

        assert_eq!(appointment.id, "google-1");
        assert_eq!(appointment.title, "Reunião");
        assert_eq!(appointment.date.to_string(), "2024-03-15");
        assert_eq!(appointment.time.format("%H:%M").to_string(), "10:00");
        assert_eq!(appointment.duration_minutes, Some(60));
        assert_eq!(appointment.source, Source::External);
        assert_eq!(appointment.client_name, "");
        assert_eq!(appointment.employee_name, "");
    }

    #[test]
    fn test_utc_timestamp_moves_to_fixed_offset() {
        // 01:30 UTC is still the previous evening in São Paulo
        let event = timed("2", Some("Late"), "2024-03-16T01:30:00Z", "2024-03-16T02:00:00Z");
        let appointment = transform(&event, sao_paulo()).unwrap();

        assert_eq!(appointment.date.to_string(), "2024-03-15");
        assert_eq!(appointment.time.format("%H:%M").to_string(), "22:30");
        assert_eq!(appointment.duration_minutes, Some(30));
    }

    #[test]
    fn test_all_day_event_starts_at_midnight() {
        let event = RawEvent {
            id: "3".to_string(),
            summary: Some("Feriado".to_string()),
            start: EventDateTime {
                date: Some("2024-03-29".to_string()),
                ..Default::default()
            },
            end: EventDateTime {
                date: Some("2024-03-30".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let appointment = transform(&event, sao_paulo()).unwrap();

        assert_eq!(appointment.date.to_string(), "2024-03-29");
        assert_eq!(appointment.time, NaiveTime::default());
        assert_eq!(appointment.duration_minutes, None);
    }

    #[test]
    fn test_missing_title_uses_placeholder() {
        let event = timed("4", None, "2024-03-15T10:00:00", "2024-03-15T11:00:00");
        assert_eq!(transform(&event, sao_paulo()).unwrap().title, UNTITLED_EVENT);

        let blank = timed("5", Some("  "), "2024-03-15T10:00:00", "2024-03-15T11:00:00");
        assert_eq!(transform(&blank, sao_paulo()).unwrap().title, UNTITLED_EVENT);
    }

    #[test]
    fn test_transform_is_deterministic() {
        let mut event = timed("6", Some("Botox"), "2024-03-15T10:00:00-03:00", "2024-03-15T10:45:00-03:00");
        event.description = Some("Cliente: Carlos Santos".to_string());
        event.location = Some("Sala 2".to_string());

        let first = transform(&event, sao_paulo()).unwrap();
        let second = transform(&event, sao_paulo()).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_description_fills_client_and_employee() {
        let mut event = timed("7", Some("Preenchimento"), "2024-03-15T14:00:00", "2024-03-15T15:00:00");
        event.description = Some("Cliente: Julia Costa\nProfissional: Dra. Maria\nTrazer exames".to_string());

        let appointment = transform(&event, sao_paulo()).unwrap();

        assert_eq!(appointment.client_name, "Julia Costa");
        assert_eq!(appointment.employee_name, "Dra. Maria");
        assert!(appointment.description.unwrap().contains("Trazer exames"));
    }

    #[test]
    fn test_event_without_start_is_rejected_and_skipped() {
        let broken = RawEvent {
            id: "8".to_string(),
            ..Default::default()
        };
        let fine = timed("9", Some("Ok"), "2024-03-15T10:00:00", "2024-03-15T11:00:00");

        assert!(transform(&broken, sao_paulo()).is_err());

        let batch = transform_all(&[broken, fine], sao_paulo());
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, "google-9");
    }

    #[test]
    fn test_draft_carries_people_and_offset() {
        let appointment = Appointment::local(&AppointmentDraft {
            title: "Botox".to_string(),
            client_name: "Carlos Santos".to_string(),
            employee_name: "Dra. Patricia".to_string(),
            date: "2024-03-19".to_string(),
            time: "11:45".to_string(),
            duration_minutes: Some(60),
            ..Default::default()
        })
        .unwrap();

        let draft = to_draft(&appointment, sao_paulo(), "America/Sao_Paulo").unwrap();

        assert_eq!(draft.summary, "Botox");
        assert_eq!(draft.description, "Cliente: Carlos Santos\nProfissional: Dra. Patricia");
        assert_eq!(draft.start.date_time, "2024-03-19T11:45:00-03:00");
        assert_eq!(draft.end.date_time, "2024-03-19T12:45:00-03:00");
        assert_eq!(draft.start.time_zone, "America/Sao_Paulo");
        assert_eq!(draft.location, "");
    }

    #[test]
    fn test_draft_without_duration_ends_at_start() {
        let appointment = Appointment::local(&AppointmentDraft {
            title: "Retorno".to_string(),
            date: "2024-03-20".to_string(),
            time: "08:00".to_string(),
            ..Default::default()
        })
        .unwrap();

        let draft = to_draft(&appointment, sao_paulo(), "America/Sao_Paulo").unwrap();
        assert_eq!(draft.start, draft.end);
    }

    #[test]
    fn test_mirrored_people_survive_a_sync() {
        let local = Appointment::local(&AppointmentDraft {
            title: "Limpeza de Pele".to_string(),
            client_name: "Ana Silva".to_string(),
            employee_name: "Dra. Maria".to_string(),
            date: "2024-03-19".to_string(),
            time: "09:30".to_string(),
            ..Default::default()
        })
        .unwrap();
        let draft = to_draft(&local, sao_paulo(), "America/Sao_Paulo").unwrap();

        let echoed = RawEvent {
            id: "10".to_string(),
            summary: Some(draft.summary.clone()),
            description: Some(draft.description.clone()),
            location: None,
            start: EventDateTime {
                date_time: Some(draft.start.date_time.clone()),
                time_zone: Some(draft.start.time_zone.clone()),
                date: None,
            },
            end: EventDateTime::default(),
        };
        let imported = transform(&echoed, sao_paulo()).unwrap();

        assert_eq!(imported.client_name, "Ana Silva");
        assert_eq!(imported.employee_name, "Dra. Maria");
        assert_eq!((imported.date, imported.time), (local.date, local.time));
    }
}
