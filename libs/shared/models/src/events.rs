use crate::booking::{Appointment, AppointmentStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Domain events published after a mutation has been committed to the store.
/// Consumers (notifications, websocket fan-out) must never be able to fail a
/// booking, so publishing is fire-and-forget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEvent {
    Booked {
        appointment: Appointment,
    },
    StatusChanged {
        previous: AppointmentStatus,
        appointment: Appointment,
    },
    Updated {
        appointment: Appointment,
    },
    Deleted {
        appointment: Appointment,
    },
}

impl BookingEvent {
    pub fn appointment(&self) -> &Appointment {
        match self {
            BookingEvent::Booked { appointment }
            | BookingEvent::StatusChanged { appointment, .. }
            | BookingEvent::Updated { appointment }
            | BookingEvent::Deleted { appointment } => appointment,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BookingEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.sender.subscribe()
    }

    /// A send only fails when nobody is subscribed, which is fine.
    pub fn publish(&self, event: BookingEvent) {
        if let Err(err) = self.sender.send(event) {
            tracing::debug!("no event subscribers: {}", err);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
