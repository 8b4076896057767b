use chrono::{Duration, Utc};
use shared_database::StoreError;
use shared_models::booking::{Appointment, AppointmentStatus, Service};
use shared_models::events::BookingEvent;
use uuid::Uuid;

use crate::models::{BookAppointmentRequest, BookingError};
use crate::services::overlap::OverlapIndex;
use crate::AppState;

/// Admits new bookings. The conflict check and insert run under the
/// provider's lock, so two concurrent requests for the same slot cannot both
/// pass the check.
pub struct BookingAdmission<'a> {
    state: &'a AppState,
}

impl<'a> BookingAdmission<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    async fn validated_service(
        &self,
        request: &BookAppointmentRequest,
    ) -> Result<Service, BookingError> {
        let service = match self.state.store.find_service(request.service_id).await {
            Ok(service) => service,
            Err(StoreError::NotFound) => return Err(BookingError::NotFound("Service")),
            Err(err) => return Err(err.into()),
        };

        // An inactive service is indistinguishable from a missing one.
        if !service.is_active {
            return Err(BookingError::NotFound("Service"));
        }
        if service.provider_id != request.provider_id {
            return Err(BookingError::Validation(
                "Service does not belong to this provider".to_string(),
            ));
        }
        if request.date != request.start_time.date_naive() {
            return Err(BookingError::Validation(
                "Date does not match start time".to_string(),
            ));
        }
        Ok(service)
    }

    pub async fn book(
        &self,
        user_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        let service = self.validated_service(&request).await?;
        let end_time = request.start_time + Duration::minutes(service.duration_minutes as i64);

        let lock = self.state.locks.lock_for(request.provider_id);
        let _guard = lock.lock().await;

        let overlap = OverlapIndex::new(self.state.store.clone());
        let candidate = shared_models::booking::TimeSlot::new(request.start_time, end_time);
        if overlap
            .has_conflict(request.provider_id, candidate, None)
            .await?
        {
            return Err(BookingError::SlotConflict);
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            provider_id: request.provider_id,
            user_id,
            service_id: service.id,
            date: request.date,
            start_time: request.start_time,
            end_time,
            status: AppointmentStatus::Pending,
            notes: request.notes,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        };

        let stored = self.state.store.insert_appointment(&appointment).await?;

        tracing::info!(
            appointment_id = %stored.id,
            provider_id = %stored.provider_id,
            start = %stored.start_time,
            "appointment booked"
        );
        self.state.events.publish(BookingEvent::Booked {
            appointment: stored.clone(),
        });

        Ok(stored)
    }
}
