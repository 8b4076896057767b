use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared_database::StoreError;
use shared_models::booking::{Appointment, AppointmentStatus, TimeSlot};
use shared_models::error::AppError;
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub service_id: Uuid,
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Partial update. Absent fields keep their stored values.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub date: Option<NaiveDate>,
    pub start_time: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub service_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAppointmentsQuery {
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
    pub service_id: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub available_slots: Vec<TimeSlot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPage {
    pub appointments: Vec<Appointment>,
    pub pagination: Pagination,
}

/// Window over the merged customer/provider calendar.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Appointment projected into a calendar entry. `title` is the service name.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: Uuid,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub description: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Time slot is already booked")]
    SlotConflict,

    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Access denied")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            BookingError::SlotConflict => {
                AppError::BadRequest("Time slot is already booked".to_string())
            }
            BookingError::InvalidTransition { .. } => AppError::BadRequest(err.to_string()),
            BookingError::Unauthorized => AppError::Forbidden("Access denied".to_string()),
            BookingError::Validation(msg) => AppError::ValidationError(msg),
            BookingError::Store(StoreError::NotFound) => {
                AppError::NotFound("Record not found".to_string())
            }
            BookingError::Store(inner) => AppError::Database(inner.to_string()),
        }
    }
}
