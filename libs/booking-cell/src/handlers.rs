use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use shared_database::AppointmentFilter;
use shared_models::auth::User;
use shared_models::booking::TimeSlot;
use shared_models::error::AppError;

use crate::models::{
    AppointmentPage, AvailabilityQuery, AvailabilityResponse, BookAppointmentRequest,
    BookingError, CalendarEvent, CalendarQuery, ListAppointmentsQuery, Pagination,
    UpdateAppointmentRequest,
};
use crate::services::admission::BookingAdmission;
use crate::services::lifecycle::AppointmentLifecycle;
use crate::services::overlap::OverlapIndex;
use crate::services::slots;
use crate::services::working_hours::WorkingHoursResolver;
use crate::AppState;

const DEFAULT_PAGE_SIZE: u32 = 10;

fn caller_id(user: &User) -> Result<Uuid, AppError> {
    user.uuid()
        .ok_or_else(|| AppError::Auth("Invalid subject claim".to_string()))
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

/// Public: no auth required to browse open slots.
pub async fn get_availability(
    State(state): State<AppState>,
    Path(provider_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let service = match state.store.find_service(query.service_id).await {
        Ok(service) => service,
        Err(shared_database::StoreError::NotFound) => {
            return Err(AppError::NotFound("Service not found".to_string()))
        }
        Err(err) => return Err(AppError::Database(err.to_string())),
    };

    let week = WorkingHoursResolver::new(state.store.clone())
        .resolve(provider_id)
        .await?;
    let day = week.day(query.date.weekday());

    let busy = if day.is_open {
        let window = TimeSlot::new(
            query.date.and_time(day.start).and_utc(),
            query.date.and_time(day.end).and_utc(),
        );
        OverlapIndex::new(state.store.clone())
            .busy_slots(provider_id, window)
            .await?
    } else {
        Vec::new()
    };

    let available_slots = slots::generate(
        day,
        query.date,
        service.duration_minutes as i64,
        &busy,
        Utc::now(),
    );

    Ok(Json(AvailabilityResponse { available_slots }))
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

pub async fn book_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user_id = caller_id(&user)?;

    let appointment = BookingAdmission::new(&state).book(user_id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appointment booked successfully",
            "appointment": appointment
        })),
    ))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentLifecycle::new(&state)
        .fetch_authorized(&user, appointment_id)
        .await?;

    Ok(Json(json!({ "appointment": appointment })))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentLifecycle::new(&state)
        .update(&user, appointment_id, request)
        .await?;

    Ok(Json(json!({
        "message": "Appointment updated successfully",
        "appointment": appointment
    })))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    AppointmentLifecycle::new(&state)
        .delete(&user, appointment_id)
        .await?;

    Ok(Json(json!({ "message": "Appointment deleted successfully" })))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

async fn paged(
    state: &AppState,
    filter: AppointmentFilter,
    page: u32,
    limit: u32,
) -> Result<AppointmentPage, BookingError> {
    let appointments = state.store.list_appointments(&filter).await?;
    let total = state.store.count_appointments(&filter).await?;

    Ok(AppointmentPage {
        appointments,
        pagination: Pagination {
            page,
            limit,
            total,
            pages: total.div_ceil(limit as u64),
        },
    })
}

fn page_params(query: &ListAppointmentsQuery) -> (u32, u32) {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    (page, limit)
}

/// The caller's own appointments, newest first.
pub async fn my_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<AppointmentPage>, AppError> {
    let user_id = caller_id(&user)?;
    let (page, limit) = page_params(&query);

    let filter = AppointmentFilter {
        user_id: Some(user_id),
        status: query.status,
        date: query.date,
        limit,
        offset: (page - 1) * limit,
        ..Default::default()
    };

    Ok(Json(paged(&state, filter, page, limit).await?))
}

/// Merged calendar view: every appointment where the caller is the customer
/// or the provider, projected into event entries.
pub async fn get_calendar_events(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_id(&user)?;

    let appointments = state
        .store
        .appointments_for_party(user_id, query.start_date, query.end_date)
        .await
        .map_err(|err| AppError::Database(err.to_string()))?;

    // One name lookup per distinct service.
    let mut titles: HashMap<Uuid, String> = HashMap::new();
    let mut events = Vec::with_capacity(appointments.len());
    for appointment in appointments {
        let title = match titles.get(&appointment.service_id) {
            Some(name) => name.clone(),
            None => {
                let name = match state.store.find_service(appointment.service_id).await {
                    Ok(service) => service.name,
                    Err(shared_database::StoreError::NotFound) => "Appointment".to_string(),
                    Err(err) => return Err(AppError::Database(err.to_string())),
                };
                titles.insert(appointment.service_id, name.clone());
                name
            }
        };
        events.push(CalendarEvent {
            id: appointment.id,
            title,
            start: appointment.start_time,
            end: appointment.end_time,
            status: appointment.status,
            description: appointment.notes,
        });
    }

    Ok(Json(json!({ "events": events })))
}

/// Provider and admin listing. Providers see their own book; admins see all.
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<AppointmentPage>, AppError> {
    if !user.is_provider() && !user.is_admin() {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }
    let (page, limit) = page_params(&query);

    let filter = AppointmentFilter {
        provider_id: if user.is_provider() {
            Some(caller_id(&user)?)
        } else {
            None
        },
        service_id: query.service_id,
        status: query.status,
        date: query.date,
        limit,
        offset: (page - 1) * limit,
        ..Default::default()
    };

    Ok(Json(paged(&state, filter, page, limit).await?))
}
