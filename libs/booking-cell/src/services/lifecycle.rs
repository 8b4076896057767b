use chrono::Utc;
use shared_database::StoreError;
use shared_models::auth::User;
use shared_models::booking::{Appointment, AppointmentStatus, TimeSlot};
use shared_models::events::BookingEvent;
use uuid::Uuid;

use crate::models::{BookingError, UpdateAppointmentRequest};
use crate::services::overlap::OverlapIndex;
use crate::AppState;

/// Allowed status transitions. Terminal states allow none.
pub fn valid_transitions(from: AppointmentStatus) -> &'static [AppointmentStatus] {
    match from {
        AppointmentStatus::Pending => {
            &[AppointmentStatus::Confirmed, AppointmentStatus::Cancelled]
        }
        AppointmentStatus::Confirmed => &[
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
            AppointmentStatus::NoShow,
        ],
        AppointmentStatus::Cancelled
        | AppointmentStatus::Completed
        | AppointmentStatus::NoShow => &[],
    }
}

pub fn validate_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), BookingError> {
    if valid_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(BookingError::InvalidTransition { from, to })
    }
}

/// Updates and deletes of existing appointments, with per-party
/// authorization: the booking customer, the provider, or an admin.
pub struct AppointmentLifecycle<'a> {
    state: &'a AppState,
}

impl<'a> AppointmentLifecycle<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn authorize(user: &User, appointment: &Appointment) -> Result<(), BookingError> {
        if user.is_admin() {
            return Ok(());
        }
        match user.uuid() {
            Some(id) if id == appointment.user_id || id == appointment.provider_id => Ok(()),
            _ => Err(BookingError::Unauthorized),
        }
    }

    pub async fn fetch_authorized(
        &self,
        user: &User,
        id: Uuid,
    ) -> Result<Appointment, BookingError> {
        let appointment = match self.state.store.find_appointment(id).await {
            Ok(appointment) => appointment,
            Err(StoreError::NotFound) => return Err(BookingError::NotFound("Appointment")),
            Err(err) => return Err(err.into()),
        };
        Self::authorize(user, &appointment)?;
        Ok(appointment)
    }

    pub async fn update(
        &self,
        user: &User,
        id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        let current = self.fetch_authorized(user, id).await?;

        let previous_status = current.status;
        let mut updated = current.clone();

        if let Some(status) = request.status {
            if status != previous_status {
                validate_transition(previous_status, status)?;
                updated.status = status;
            }
        }
        if let Some(notes) = request.notes {
            updated.notes = Some(notes);
        }
        if let Some(reason) = request.cancel_reason {
            updated.cancel_reason = Some(reason);
        }

        let time_changed = request.date.is_some() || request.start_time.is_some();
        if time_changed {
            let duration = current.end_time - current.start_time;
            if let Some(start_time) = request.start_time {
                updated.start_time = start_time;
                updated.end_time = start_time + duration;
            }
            updated.date = request
                .date
                .unwrap_or_else(|| updated.start_time.date_naive());
        }

        // Moving the appointment re-runs admission's conflict check, with the
        // appointment itself excluded, under the same provider lock.
        let lock = self.state.locks.lock_for(current.provider_id);
        let _guard = lock.lock().await;

        if time_changed {
            let candidate = TimeSlot::new(updated.start_time, updated.end_time);
            let overlap = OverlapIndex::new(self.state.store.clone());
            if overlap
                .has_conflict(current.provider_id, candidate, Some(current.id))
                .await?
            {
                return Err(BookingError::SlotConflict);
            }
        }

        updated.updated_at = Utc::now();
        let stored = self.state.store.update_appointment(&updated).await?;

        if stored.status != previous_status {
            tracing::info!(
                appointment_id = %stored.id,
                from = %previous_status,
                to = %stored.status,
                "appointment status changed"
            );
            self.state.events.publish(BookingEvent::StatusChanged {
                previous: previous_status,
                appointment: stored.clone(),
            });
        } else {
            self.state.events.publish(BookingEvent::Updated {
                appointment: stored.clone(),
            });
        }

        Ok(stored)
    }

    pub async fn delete(&self, user: &User, id: Uuid) -> Result<(), BookingError> {
        let appointment = self.fetch_authorized(user, id).await?;
        self.state.store.delete_appointment(id).await?;

        tracing::info!(appointment_id = %id, "appointment deleted");
        self.state
            .events
            .publish(BookingEvent::Deleted { appointment });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn pending_can_confirm_or_cancel() {
        assert!(validate_transition(
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed
        )
        .is_ok());
        assert!(validate_transition(
            AppointmentStatus::Pending,
            AppointmentStatus::Cancelled
        )
        .is_ok());
    }

    #[test]
    fn pending_cannot_complete_or_no_show() {
        assert_matches!(
            validate_transition(AppointmentStatus::Pending, AppointmentStatus::Completed),
            Err(BookingError::InvalidTransition { .. })
        );
        assert_matches!(
            validate_transition(AppointmentStatus::Pending, AppointmentStatus::NoShow),
            Err(BookingError::InvalidTransition { .. })
        );
    }

    #[test]
    fn confirmed_can_cancel_complete_or_no_show() {
        for to in [
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
            AppointmentStatus::NoShow,
        ] {
            assert!(validate_transition(AppointmentStatus::Confirmed, to).is_ok());
        }
    }

    #[test]
    fn terminal_states_allow_nothing() {
        for from in [
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
            AppointmentStatus::NoShow,
        ] {
            assert!(valid_transitions(from).is_empty());
            assert_matches!(
                validate_transition(from, AppointmentStatus::Pending),
                Err(BookingError::InvalidTransition { .. })
            );
            assert_matches!(
                validate_transition(from, AppointmentStatus::Confirmed),
                Err(BookingError::InvalidTransition { .. })
            );
        }
    }
}
