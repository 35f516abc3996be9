//! User-visible notifications (toasts).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Older notifications are dropped once this many are pending
const FEED_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Notification {
            title: title.into(),
            description: description.into(),
            variant: Variant::Default,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Notification {
            title: title.into(),
            description: description.into(),
            variant: Variant::Destructive,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Bounded queue of pending notifications that the dashboard polls.
#[derive(Debug, Clone, Default)]
pub struct NotificationFeed {
    pending: Arc<Mutex<VecDeque<Notification>>>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything pending, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.drain(..).collect()
    }
}

impl Notifier for NotificationFeed {
    fn notify(&self, notification: Notification) {
        match notification.variant {
            Variant::Default => info!(title = %notification.title, "{}", notification.description),
            Variant::Destructive => warn!(title = %notification.title, "{}", notification.description),
        }

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.len() == FEED_CAPACITY {
            pending.pop_front();
        }
        pending.push_back(notification);
    }
}
