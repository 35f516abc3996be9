//! Appointment calendar with Google Calendar sync for the clinic dashboard.
//!
//! - `store` holds local and Google-imported appointments side by side
//! - `orchestrator` runs sync and mirroring and tracks the sync phase
//! - `connection` and `auth` handle the OAuth redirect handshake
//! - `dashboard` wires everything together

pub mod appointment;
pub mod auth;
pub mod connection;
pub mod dashboard;
pub mod date_range;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod remote;
pub mod session;
pub mod settings;
pub mod store;
pub mod transform;

pub use appointment::{Appointment, AppointmentDraft, Source};
pub use dashboard::Dashboard;
pub use error::{CalendarError, CalendarResult};
pub use orchestrator::{MirrorOutcome, SyncOrchestrator, SyncPhase, SyncReport};
pub use settings::{GoogleSettings, SyncSettings};
