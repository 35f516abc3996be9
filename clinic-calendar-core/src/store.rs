//! In-memory appointment store for one dashboard session.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::appointment::{Appointment, AppointmentDraft, Source};
use crate::error::{CalendarError, CalendarResult};

/// Store handle shared between the orchestrator and the HTTP routes.
pub type SharedStore = Arc<RwLock<AppointmentStore>>;

/// Appointments partitioned by source.
///
/// Local appointments change only through user edits. External appointments
/// change only as a whole batch, through `replace_external` or
/// `clear_external`.
#[derive(Debug, Default, Clone)]
pub struct AppointmentStore {
    appointments: Vec<Appointment>,
}

/// Counts from a replace-batch merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub removed: usize,
    pub inserted: usize,
}

impl AppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    pub fn all(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    pub fn by_source(&self, source: Source) -> impl Iterator<Item = &Appointment> {
        self.appointments.iter().filter(move |a| a.source == source)
    }

    /// Appointments on one day, ordered by time.
    pub fn on_date(&self, date: NaiveDate) -> Vec<&Appointment> {
        let mut day: Vec<_> = self.appointments.iter().filter(|a| a.date == date).collect();
        day.sort_by_key(|a| a.time);
        day
    }

    /// All appointments ordered by date and time.
    pub fn sorted(&self) -> Vec<Appointment> {
        let mut sorted = self.appointments.clone();
        sorted.sort_by(|a, b| (a.date, a.time).cmp(&(b.date, b.time)));
        sorted
    }

    pub fn insert_local(&mut self, appointment: Appointment) {
        debug_assert_eq!(appointment.source, Source::Local);
        self.appointments.push(appointment);
    }

    /// Drop every external appointment and insert the fresh batch.
    pub fn replace_external(&mut self, batch: Vec<Appointment>) -> MergeStats {
        let removed = self.clear_external();
        let before = self.appointments.len();
        self.appointments
            .extend(batch.into_iter().filter(|a| a.source == Source::External));
        MergeStats {
            removed,
            inserted: self.appointments.len() - before,
        }
    }

    /// Remove all external appointments, returning how many were dropped.
    pub fn clear_external(&mut self) -> usize {
        let before = self.appointments.len();
        self.appointments.retain(|a| a.source == Source::Local);
        before - self.appointments.len()
    }

    pub fn update_local(&mut self, id: &str, draft: &AppointmentDraft) -> CalendarResult<Appointment> {
        let appointment = self.local_mut(id)?;
        appointment.apply(draft)?;
        Ok(appointment.clone())
    }

    pub fn delete_local(&mut self, id: &str) -> CalendarResult<Appointment> {
        self.local_mut(id)?;
        let index = self
            .appointments
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| CalendarError::NotFound(id.to_string()))?;
        Ok(self.appointments.remove(index))
    }

    /// Record the Google event id once a local appointment has been mirrored.
    pub fn set_remote_event_id(&mut self, id: &str, remote_event_id: String) -> CalendarResult<()> {
        self.local_mut(id)?.remote_event_id = Some(remote_event_id);
        Ok(())
    }

    fn local_mut(&mut self, id: &str) -> CalendarResult<&mut Appointment> {
        let appointment = self
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| CalendarError::NotFound(id.to_string()))?;

        if appointment.is_external() {
            return Err(CalendarError::ReadOnly(id.to_string()));
        }
        Ok(appointment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::EXTERNAL_COLOR;
    use chrono::NaiveTime;

    fn local(title: &str, time: &str) -> Appointment {
        Appointment::local(&AppointmentDraft {
            title: title.to_string(),
            client_name: "Julia Costa".to_string(),
            employee_name: "Dra. Maria".to_string(),
            date: "2024-03-15".to_string(),
            time: time.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn external(id: &str) -> Appointment {
        Appointment {
            id: format!("google-{id}"),
            title: format!("Remote {id}"),
            client_name: String::new(),
            employee_name: String::new(),
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            duration_minutes: None,
            source: Source::External,
            color_tag: EXTERNAL_COLOR.to_string(),
            description: None,
            location: None,
            remote_event_id: Some(id.to_string()),
        }
    }

    #[test]
    fn test_replace_external_keeps_local_records() {
        let mut store = AppointmentStore::new();
        let botox = local("Botox", "11:45");
        store.insert_local(botox.clone());
        store.replace_external(vec![external("a"), external("b")]);

        let stats = store.replace_external(vec![external("c")]);

        assert_eq!(stats, MergeStats { removed: 2, inserted: 1 });
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&botox.id), Some(&botox));
        assert!(store.get("google-a").is_none());
        assert!(store.get("google-c").is_some());
    }

    #[test]
    fn test_replace_with_empty_batch_clears_external() {
        let mut store = AppointmentStore::new();
        store.insert_local(local("Botox", "11:45"));
        store.replace_external(vec![external("a")]);

        store.replace_external(vec![]);

        assert_eq!(store.by_source(Source::External).count(), 0);
        assert_eq!(store.by_source(Source::Local).count(), 1);
    }

    #[test]
    fn test_local_rows_in_a_batch_are_not_counted() {
        let mut store = AppointmentStore::new();

        let stats = store.replace_external(vec![external("a"), local("Botox", "11:45")]);

        assert_eq!(stats.inserted, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_external_records_are_read_only() {
        let mut store = AppointmentStore::new();
        store.replace_external(vec![external("a")]);

        assert!(matches!(
            store.delete_local("google-a"),
            Err(CalendarError::ReadOnly(_))
        ));
        assert!(matches!(
            store.update_local("google-a", &AppointmentDraft::default()),
            Err(CalendarError::ReadOnly(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_and_delete_local() {
        let mut store = AppointmentStore::new();
        let appointment = local("Botox", "11:45");
        let id = appointment.id.clone();
        store.insert_local(appointment);

        let updated = store
            .update_local(
                &id,
                &AppointmentDraft {
                    title: "Preenchimento".to_string(),
                    date: "2024-03-16".to_string(),
                    time: "14:00".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.title, "Preenchimento");

        let deleted = store.delete_local(&id).unwrap();
        assert_eq!(deleted.title, "Preenchimento");
        assert!(store.is_empty());
        assert!(matches!(store.delete_local(&id), Err(CalendarError::NotFound(_))));
    }

    #[test]
    fn test_on_date_orders_by_time() {
        let mut store = AppointmentStore::new();
        store.insert_local(local("Microagulhamento", "16:30"));
        store.insert_local(local("Limpeza de Pele", "09:30"));
        store.replace_external(vec![external("a")]);

        let day = store.on_date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        let titles: Vec<_> = day.iter().map(|a| a.title.as_str()).collect();

        assert_eq!(titles, vec!["Remote a", "Limpeza de Pele", "Microagulhamento"]);
    }
}
