use chrono::Utc;
use serde_json::json;
use shared_models::booking::{
    Appointment, AppointmentStatus, Notification, NotificationKind,
};
use shared_models::events::BookingEvent;
use uuid::Uuid;

fn notification(
    user_id: Uuid,
    kind: NotificationKind,
    title: &str,
    message: String,
    appointment: &Appointment,
) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        user_id,
        kind,
        title: title.to_string(),
        message,
        data: Some(json!({ "appointmentId": appointment.id })),
        is_read: false,
        created_at: Utc::now(),
    }
}

fn when(appointment: &Appointment) -> String {
    appointment.start_time.format("%B %d, %Y at %H:%M").to_string()
}

/// In-app notifications owed for an event. A new booking notifies the
/// provider; status changes notify the customer. No-shows stay silent.
pub fn notifications_for(event: &BookingEvent) -> Vec<Notification> {
    match event {
        BookingEvent::Booked { appointment } => vec![notification(
            appointment.provider_id,
            NotificationKind::AppointmentBooked,
            "New Appointment Booked",
            format!("A customer has booked an appointment for {}", when(appointment)),
            appointment,
        )],
        BookingEvent::StatusChanged { appointment, .. } => match appointment.status {
            AppointmentStatus::Confirmed => vec![notification(
                appointment.user_id,
                NotificationKind::AppointmentConfirmed,
                "Appointment Confirmed",
                format!("Your appointment for {} has been confirmed", when(appointment)),
                appointment,
            )],
            AppointmentStatus::Cancelled => vec![notification(
                appointment.user_id,
                NotificationKind::AppointmentCancelled,
                "Appointment Cancelled",
                format!("Your appointment for {} has been cancelled", when(appointment)),
                appointment,
            )],
            AppointmentStatus::Completed => vec![notification(
                appointment.user_id,
                NotificationKind::AppointmentCompleted,
                "Appointment Completed",
                format!("Your appointment for {} has been completed", when(appointment)),
                appointment,
            )],
            AppointmentStatus::Pending | AppointmentStatus::NoShow => Vec::new(),
        },
        BookingEvent::Updated { .. } | BookingEvent::Deleted { .. } => Vec::new(),
    }
}

pub fn reminder_for(appointment: &Appointment) -> Notification {
    notification(
        appointment.user_id,
        NotificationKind::AppointmentReminder,
        "Appointment Reminder",
        format!("You have an appointment coming up on {}", when(appointment)),
        appointment,
    )
}

/// (recipient, subject, body) emails owed for an event. Booking mails both
/// parties; the recipient resolution happens in the consumer.
pub enum EmailRecipient {
    Customer,
    Provider,
}

pub fn emails_for(event: &BookingEvent) -> Vec<(EmailRecipient, String, String)> {
    match event {
        BookingEvent::Booked { appointment } => vec![
            (
                EmailRecipient::Customer,
                "Appointment Booking Confirmation".to_string(),
                format!(
                    "Your appointment has been booked for {}",
                    when(appointment)
                ),
            ),
            (
                EmailRecipient::Provider,
                "New Appointment Booking".to_string(),
                format!(
                    "You have a new appointment booking for {}",
                    when(appointment)
                ),
            ),
        ],
        BookingEvent::StatusChanged { appointment, .. } => match appointment.status {
            AppointmentStatus::Confirmed => vec![(
                EmailRecipient::Customer,
                "Appointment Confirmed".to_string(),
                format!(
                    "Your appointment for {} has been confirmed",
                    when(appointment)
                ),
            )],
            AppointmentStatus::Cancelled => vec![(
                EmailRecipient::Customer,
                "Appointment Cancelled".to_string(),
                format!(
                    "Your appointment for {} has been cancelled",
                    when(appointment)
                ),
            )],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn appointment(status: AppointmentStatus) -> Appointment {
        let start = chrono::Utc.with_ymd_and_hms(2030, 1, 7, 10, 0, 0).unwrap();
        Appointment {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
            start_time: start,
            end_time: start + chrono::Duration::minutes(30),
            status,
            notes: None,
            cancel_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn booking_notifies_the_provider() {
        let appointment = appointment(AppointmentStatus::Pending);
        let event = BookingEvent::Booked {
            appointment: appointment.clone(),
        };

        let out = notifications_for(&event);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].user_id, appointment.provider_id);
        assert_eq!(out[0].kind, NotificationKind::AppointmentBooked);
    }

    #[test]
    fn confirmation_notifies_the_customer() {
        let appointment = appointment(AppointmentStatus::Confirmed);
        let event = BookingEvent::StatusChanged {
            previous: AppointmentStatus::Pending,
            appointment: appointment.clone(),
        };

        let out = notifications_for(&event);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].user_id, appointment.user_id);
        assert_eq!(out[0].kind, NotificationKind::AppointmentConfirmed);
    }

    #[test]
    fn no_show_stays_silent() {
        let event = BookingEvent::StatusChanged {
            previous: AppointmentStatus::Confirmed,
            appointment: appointment(AppointmentStatus::NoShow),
        };
        assert!(notifications_for(&event).is_empty());
        assert!(emails_for(&event).is_empty());
    }

    #[test]
    fn booking_mails_both_parties() {
        let event = BookingEvent::Booked {
            appointment: appointment(AppointmentStatus::Pending),
        };
        assert_eq!(emails_for(&event).len(), 2);
    }
}
