pub mod memory;
pub mod rest;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shared_models::booking::{Appointment, AppointmentStatus, Notification, Service, WeekSchedule};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use rest::RestStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,
    #[error("Database error: {0}")]
    Backend(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Filter for listing appointments. All fields are conjunctive; `None` means
/// "don't filter on this".
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub provider_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
    pub limit: u32,
    pub offset: u32,
}

/// Persistence seam for the booking engine. The production backend is a REST
/// store ([`RestStore`]); tests and local runs use [`MemoryStore`].
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_service(&self, id: Uuid) -> Result<Service, StoreError>;

    async fn find_week_schedule(&self, provider_id: Uuid) -> Result<Option<WeekSchedule>, StoreError>;

    async fn find_appointment(&self, id: Uuid) -> Result<Appointment, StoreError>;

    /// Non-cancelled appointments for a provider whose interval intersects
    /// [from, to). Used for both availability and admission checks.
    async fn active_appointments_in_range(
        &self,
        provider_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn count_appointments(&self, filter: &AppointmentFilter) -> Result<u64, StoreError>;

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<Appointment, StoreError>;

    async fn update_appointment(&self, appointment: &Appointment) -> Result<Appointment, StoreError>;

    async fn delete_appointment(&self, id: Uuid) -> Result<(), StoreError>;

    /// Confirmed appointments starting inside [from, to). Drives reminders.
    async fn confirmed_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// Appointments where the user is either the customer or the provider,
    /// optionally bounded by start time, ascending. Feeds the calendar view.
    async fn appointments_for_party(
        &self,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError>;

    /// A user's notifications, newest first.
    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn unread_notification_count(&self, user_id: Uuid) -> Result<u64, StoreError>;

    /// Marks one notification read. The user scope keeps one user from
    /// touching another's rows; a miss either way is `NotFound`.
    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Notification, StoreError>;

    /// Marks every unread notification read, returning how many changed.
    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64, StoreError>;

    async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError>;

    async fn find_user_email(&self, user_id: Uuid) -> Result<Option<String>, StoreError>;
}
