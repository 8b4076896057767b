use std::sync::Arc;

use shared_database::BookingStore;
use shared_models::booking::TimeSlot;
use uuid::Uuid;

use crate::models::BookingError;

/// Conflict checks against a provider's active (non-cancelled) appointments.
pub struct OverlapIndex {
    store: Arc<dyn BookingStore>,
}

impl OverlapIndex {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Active appointments intersecting the given interval, as busy slots.
    pub async fn busy_slots(
        &self,
        provider_id: Uuid,
        window: TimeSlot,
    ) -> Result<Vec<TimeSlot>, BookingError> {
        let appointments = self
            .store
            .active_appointments_in_range(provider_id, window.start_time, window.end_time)
            .await?;
        Ok(appointments.iter().map(|a| a.slot()).collect())
    }

    /// True when any active appointment (other than `exclude`) overlaps the
    /// candidate slot.
    pub async fn has_conflict(
        &self,
        provider_id: Uuid,
        candidate: TimeSlot,
        exclude: Option<Uuid>,
    ) -> Result<bool, BookingError> {
        let appointments = self
            .store
            .active_appointments_in_range(provider_id, candidate.start_time, candidate.end_time)
            .await?;
        Ok(appointments
            .iter()
            .filter(|a| Some(a.id) != exclude)
            .any(|a| a.slot().overlaps(&candidate)))
    }
}
