use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::BookingStore;
use shared_models::events::{BookingEvent, EventBus};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::dispatcher::{self, EmailRecipient};
use crate::email::EmailSender;

/// Consumes booking events and persists in-app notifications plus outbound
/// emails. All failures here are logged and swallowed: the booking already
/// committed.
pub struct NotificationConsumer {
    store: Arc<dyn BookingStore>,
    email: EmailSender,
}

impl NotificationConsumer {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn BookingStore>) -> Self {
        Self {
            store,
            email: EmailSender::new(config),
        }
    }

    pub fn spawn(self, events: &EventBus) -> tokio::task::JoinHandle<()> {
        let mut receiver = events.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => self.handle(&event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "notification consumer lagged behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn resolve_email(&self, user_id: Uuid) -> Option<String> {
        match self.store.find_user_email(user_id).await {
            Ok(email) => email,
            Err(err) => {
                tracing::warn!(%user_id, "email lookup failed: {}", err);
                None
            }
        }
    }

    pub async fn handle(&self, event: &BookingEvent) {
        for notification in dispatcher::notifications_for(event) {
            if let Err(err) = self.store.insert_notification(&notification).await {
                tracing::warn!(
                    user_id = %notification.user_id,
                    kind = %notification.kind,
                    "failed to store notification: {}",
                    err
                );
            }
        }

        let appointment = event.appointment();
        for (recipient, subject, body) in dispatcher::emails_for(event) {
            let user_id = match recipient {
                EmailRecipient::Customer => appointment.user_id,
                EmailRecipient::Provider => appointment.provider_id,
            };
            let Some(address) = self.resolve_email(user_id).await else {
                continue;
            };
            if let Err(err) = self.email.send(&address, &subject, &body).await {
                tracing::warn!(%address, %subject, "email sending failed: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use shared_database::MemoryStore;
    use shared_models::booking::{Appointment, AppointmentStatus, NotificationKind};
    use shared_utils::test_utils::TestConfig;

    fn appointment() -> Appointment {
        let start = Utc.with_ymd_and_hms(2030, 1, 7, 10, 0, 0).unwrap();
        Appointment {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
            start_time: start,
            end_time: start + Duration::minutes(30),
            status: AppointmentStatus::Pending,
            notes: None,
            cancel_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn booking_event_stores_a_provider_notification() {
        let store = Arc::new(MemoryStore::new());
        let consumer =
            NotificationConsumer::new(TestConfig::default().to_arc(), store.clone());

        let appointment = appointment();
        consumer
            .handle(&BookingEvent::Booked {
                appointment: appointment.clone(),
            })
            .await;

        let stored = store.notifications().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].user_id, appointment.provider_id);
        assert_eq!(stored[0].kind, NotificationKind::AppointmentBooked);
    }

    #[tokio::test]
    async fn events_flow_through_the_bus() {
        let store = Arc::new(MemoryStore::new());
        let events = EventBus::default();
        let handle = NotificationConsumer::new(TestConfig::default().to_arc(), store.clone())
            .spawn(&events);

        let mut appointment = appointment();
        appointment.status = AppointmentStatus::Confirmed;
        events.publish(BookingEvent::StatusChanged {
            previous: AppointmentStatus::Pending,
            appointment: appointment.clone(),
        });

        // Give the consumer task a beat to drain the channel.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let stored = store.notifications().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].user_id, appointment.user_id);
        handle.abort();
    }
}
