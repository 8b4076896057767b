use std::sync::Arc;

use chrono::{Duration, Utc};
use shared_config::AppConfig;
use shared_database::BookingStore;
use uuid::Uuid;

use crate::dispatcher;
use crate::email::EmailSender;

/// Periodic sweep that reminds customers of confirmed appointments starting
/// 24 to 48 hours out. One tick per `reminder_interval_secs`, so with the
/// default daily interval each appointment gets exactly one reminder.
pub struct ReminderScheduler {
    config: Arc<AppConfig>,
    store: Arc<dyn BookingStore>,
    email: EmailSender,
}

impl ReminderScheduler {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn BookingStore>) -> Self {
        let email = EmailSender::new(config.clone());
        Self {
            config,
            store,
            email,
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        let period = std::time::Duration::from_secs(self.config.reminder_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; skip it so a restart doesn't
            // double-remind.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.sweep().await;
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

    pub async fn sweep(&self) {
        let now = Utc::now();
        let from = now + Duration::hours(24);
        let to = now + Duration::hours(48);

        let upcoming = match self.store.confirmed_starting_between(from, to).await {
            Ok(appointments) => appointments,
            Err(err) => {
                tracing::warn!("reminder sweep query failed: {}", err);
                return;
            }
        };

        tracing::debug!(count = upcoming.len(), "reminder sweep");
        for appointment in upcoming {
            let notification = dispatcher::reminder_for(&appointment);
            if let Err(err) = self.store.insert_notification(&notification).await {
                tracing::warn!(appointment_id = %appointment.id, "failed to store reminder: {}", err);
            }

            if let Some(address) = self.resolve_email(appointment.user_id).await {
                if let Err(err) = self
                    .email
                    .send(
                        &address,
                        "Appointment Reminder",
                        &notification.message,
                    )
                    .await
                {
                    tracing::warn!(%address, "reminder email failed: {}", err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared_database::MemoryStore;
    use shared_models::booking::{Appointment, AppointmentStatus, NotificationKind};
    use shared_utils::test_utils::TestConfig;

    fn appointment(start: chrono::DateTime<Utc>, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
            start_time: start,
            end_time: start + Duration::minutes(30),
            status,
            notes: None,
            cancel_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn sweep_reminds_only_the_next_day_window() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();

        let tomorrow = appointment(now + Duration::hours(30), AppointmentStatus::Confirmed);
        store.seed_appointment(tomorrow.clone()).await;
        // Too soon, too late, and not confirmed: all skipped.
        store
            .seed_appointment(appointment(now + Duration::hours(2), AppointmentStatus::Confirmed))
            .await;
        store
            .seed_appointment(appointment(now + Duration::hours(72), AppointmentStatus::Confirmed))
            .await;
        store
            .seed_appointment(appointment(now + Duration::hours(30), AppointmentStatus::Pending))
            .await;

        let scheduler = ReminderScheduler::new(TestConfig::default().to_arc(), store.clone());
        scheduler.sweep().await;

        let stored = store.notifications().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].user_id, tomorrow.user_id);
        assert_eq!(stored[0].kind, NotificationKind::AppointmentReminder);
    }
}
