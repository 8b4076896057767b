use crate::{AppointmentFilter, BookingStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_models::booking::{
    Appointment, AppointmentStatus, Notification, Service, WeekSchedule,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory backend for tests and local runs without a configured database.
#[derive(Default)]
pub struct MemoryStore {
    services: RwLock<HashMap<Uuid, Service>>,
    schedules: RwLock<HashMap<Uuid, WeekSchedule>>,
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    notifications: RwLock<Vec<Notification>>,
    emails: RwLock<HashMap<Uuid, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_service(&self, service: Service) {
        self.services.write().await.insert(service.id, service);
    }

    pub async fn seed_schedule(&self, provider_id: Uuid, schedule: WeekSchedule) {
        self.schedules.write().await.insert(provider_id, schedule);
    }

    pub async fn seed_appointment(&self, appointment: Appointment) {
        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment);
    }

    pub async fn seed_email(&self, user_id: Uuid, email: impl Into<String>) {
        self.emails.write().await.insert(user_id, email.into());
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }

    fn matches(appointment: &Appointment, filter: &AppointmentFilter) -> bool {
        filter
            .provider_id
            .map_or(true, |id| appointment.provider_id == id)
            && filter.user_id.map_or(true, |id| appointment.user_id == id)
            && filter
                .service_id
                .map_or(true, |id| appointment.service_id == id)
            && filter.status.map_or(true, |s| appointment.status == s)
            && filter.date.map_or(true, |d| appointment.date == d)
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn find_service(&self, id: Uuid) -> Result<Service, StoreError> {
        self.services
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_week_schedule(
        &self,
        provider_id: Uuid,
    ) -> Result<Option<WeekSchedule>, StoreError> {
        Ok(self.schedules.read().await.get(&provider_id).cloned())
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Appointment, StoreError> {
        self.appointments
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn active_appointments_in_range(
        &self,
        provider_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let appointments = self.appointments.read().await;
        Ok(appointments
            .values()
            .filter(|a| {
                a.provider_id == provider_id
                    && a.status.blocks_slot()
                    && a.start_time < to
                    && a.end_time > from
            })
            .cloned()
            .collect())
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        let appointments = self.appointments.read().await;
        let mut rows: Vec<Appointment> = appointments
            .values()
            .filter(|a| Self::matches(a, filter))
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.start_time);
        Ok(rows
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn count_appointments(&self, filter: &AppointmentFilter) -> Result<u64, StoreError> {
        let appointments = self.appointments.read().await;
        Ok(appointments
            .values()
            .filter(|a| Self::matches(a, filter))
            .count() as u64)
    }

    async fn insert_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<Appointment, StoreError> {
        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<Appointment, StoreError> {
        let mut appointments = self.appointments.write().await;
        if !appointments.contains_key(&appointment.id) {
            return Err(StoreError::NotFound);
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<(), StoreError> {
        self.appointments
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn confirmed_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let appointments = self.appointments.read().await;
        Ok(appointments
            .values()
            .filter(|a| {
                a.status == AppointmentStatus::Confirmed
                    && a.start_time >= from
                    && a.start_time < to
            })
            .cloned()
            .collect())
    }

    async fn appointments_for_party(
        &self,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let appointments = self.appointments.read().await;
        let mut rows: Vec<Appointment> = appointments
            .values()
            .filter(|a| {
                (a.user_id == user_id || a.provider_id == user_id)
                    && from.map_or(true, |f| a.start_time >= f)
                    && to.map_or(true, |t| a.start_time <= t)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.start_time);
        Ok(rows)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, StoreError> {
        let notifications = self.notifications.read().await;
        let mut rows: Vec<Notification> = notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|n| std::cmp::Reverse(n.created_at));
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn unread_notification_count(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as u64)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Notification, StoreError> {
        let mut notifications = self.notifications.write().await;
        let found = notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        found.is_read = true;
        Ok(found.clone())
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut notifications = self.notifications.write().await;
        let mut changed = 0;
        for notification in notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            notification.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        let mut notifications = self.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|n| !(n.id == id && n.user_id == user_id));
        if notifications.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_user_email(&self, user_id: Uuid) -> Result<Option<String>, StoreError> {
        Ok(self.emails.read().await.get(&user_id).cloned())
    }
}
