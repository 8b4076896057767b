use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use booking_cell::models::{BookAppointmentRequest, BookingError};
use booking_cell::router::booking_routes;
use booking_cell::services::admission::BookingAdmission;
use booking_cell::AppState;
use shared_database::{BookingStore, MemoryStore};
use shared_models::booking::{AppointmentStatus, DaySchedule, Service, WeekSchedule};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

// Monday far in the future so "now" filtering never interferes.
const TEST_DATE: &str = "2030-01-07";

struct TestApp {
    state: AppState,
    store: Arc<MemoryStore>,
    provider: TestUser,
    customer: TestUser,
    service_id: Uuid,
    secret: String,
}

async fn setup() -> TestApp {
    let config = TestConfig::default();
    let secret = config.jwt_secret.clone();
    let store = Arc::new(MemoryStore::new());

    let provider = TestUser::provider("provider@example.com");
    let customer = TestUser::customer("customer@example.com");
    let service_id = Uuid::new_v4();

    store
        .seed_service(Service {
            id: service_id,
            provider_id: provider.uuid(),
            name: "Haircut".to_string(),
            duration_minutes: 30,
            price: 25.0,
            is_active: true,
        })
        .await;

    let weekday = DaySchedule::open(
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
    );
    store
        .seed_schedule(
            provider.uuid(),
            WeekSchedule {
                monday: weekday.clone(),
                tuesday: weekday.clone(),
                wednesday: weekday.clone(),
                thursday: weekday.clone(),
                friday: weekday,
                ..Default::default()
            },
        )
        .await;

    let state = AppState::new(config.to_arc(), store.clone() as Arc<dyn BookingStore>);

    TestApp {
        state,
        store,
        provider,
        customer,
        service_id,
        secret,
    }
}

fn app_router(app: &TestApp) -> Router {
    booking_routes(app.state.clone())
}

fn bearer(user: &TestUser, secret: &str) -> String {
    format!("Bearer {}", JwtTestUtils::create_test_token(user, secret, None))
}

fn booking_body(app: &TestApp, start: &str) -> Value {
    json!({
        "serviceId": app.service_id,
        "providerId": app.provider.uuid(),
        "date": TEST_DATE,
        "startTime": start,
        "notes": "first visit"
    })
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_req(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", token);
    }
    builder.body(Body::empty()).unwrap()
}

fn put_json(uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("Authorization", token)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn availability_lists_slots_for_an_open_day() {
    let app = setup().await;
    let uri = format!(
        "/availability/{}?date={}&serviceId={}",
        app.provider.uuid(),
        TEST_DATE,
        app.service_id
    );

    let (status, body) = send(app_router(&app), get_req(&uri, None)).await;

    assert_eq!(status, StatusCode::OK);
    let slots = body["availableSlots"].as_array().unwrap();
    assert_eq!(slots.len(), 16);
    assert_eq!(slots[0]["startTime"], "2030-01-07T09:00:00Z");
    assert_eq!(slots[0]["endTime"], "2030-01-07T09:30:00Z");
}

#[tokio::test]
async fn availability_is_empty_on_a_closed_day() {
    let app = setup().await;
    // 2030-01-06 is a Sunday.
    let uri = format!(
        "/availability/{}?date=2030-01-06&serviceId={}",
        app.provider.uuid(),
        app.service_id
    );

    let (status, body) = send(app_router(&app), get_req(&uri, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["availableSlots"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn availability_excludes_booked_slots() {
    let app = setup().await;
    let token = bearer(&app.customer, &app.secret);
    let body = booking_body(&app, "2030-01-07T10:00:00Z");
    let (status, _) = send(app_router(&app), post_json("/appointments", Some(&token), &body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!(
        "/availability/{}?date={}&serviceId={}",
        app.provider.uuid(),
        TEST_DATE,
        app.service_id
    );
    let (_, body) = send(app_router(&app), get_req(&uri, None)).await;

    let slots = body["availableSlots"].as_array().unwrap();
    assert_eq!(slots.len(), 15);
    assert!(!slots
        .iter()
        .any(|slot| slot["startTime"] == "2030-01-07T10:00:00Z"));
}

#[tokio::test]
async fn booking_requires_authentication() {
    let app = setup().await;
    let body = booking_body(&app, "2030-01-07T10:00:00Z");

    let (status, _) = send(app_router(&app), post_json("/appointments", None, &body)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn booking_a_taken_slot_is_rejected() {
    let app = setup().await;
    let token = bearer(&app.customer, &app.secret);
    let body = booking_body(&app, "2030-01-07T10:00:00Z");

    let (status, _) = send(app_router(&app), post_json("/appointments", Some(&token), &body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let other = bearer(&TestUser::customer("other@example.com"), &app.secret);
    let (status, response) =
        send(app_router(&app), post_json("/appointments", Some(&other), &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "Time slot is already booked");
}

#[tokio::test]
async fn overlapping_but_not_identical_slot_is_rejected() {
    let app = setup().await;
    let token = bearer(&app.customer, &app.secret);

    let first = booking_body(&app, "2030-01-07T10:00:00Z");
    let (status, _) = send(app_router(&app), post_json("/appointments", Some(&token), &first)).await;
    assert_eq!(status, StatusCode::CREATED);

    // 10:15 overlaps the 10:00-10:30 booking.
    let second = booking_body(&app, "2030-01-07T10:15:00Z");
    let (status, response) =
        send(app_router(&app), post_json("/appointments", Some(&token), &second)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "Time slot is already booked");
}

#[tokio::test]
async fn cancelled_appointment_frees_its_slot() {
    let app = setup().await;
    let token = bearer(&app.customer, &app.secret);
    let body = booking_body(&app, "2030-01-07T10:00:00Z");

    let (_, created) = send(app_router(&app), post_json("/appointments", Some(&token), &body)).await;
    let id = created["appointment"]["id"].as_str().unwrap().to_string();

    let cancel = json!({ "status": "CANCELLED", "cancelReason": "sick" });
    let uri = format!("/appointments/{}", id);
    let (status, _) = send(app_router(&app), put_json(&uri, &token, &cancel)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app_router(&app), post_json("/appointments", Some(&token), &body)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn lifecycle_follows_the_transition_table() {
    let app = setup().await;
    let token = bearer(&app.customer, &app.secret);
    let body = booking_body(&app, "2030-01-07T11:00:00Z");

    let (_, created) = send(app_router(&app), post_json("/appointments", Some(&token), &body)).await;
    let uri = format!(
        "/appointments/{}",
        created["appointment"]["id"].as_str().unwrap()
    );

    // PENDING cannot jump straight to COMPLETED.
    let (status, _) = send(
        app_router(&app),
        put_json(&uri, &token, &json!({ "status": "COMPLETED" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, confirmed) = send(
        app_router(&app),
        put_json(&uri, &token, &json!({ "status": "CONFIRMED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["appointment"]["status"], "CONFIRMED");

    let (status, completed) = send(
        app_router(&app),
        put_json(&uri, &token, &json!({ "status": "COMPLETED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["appointment"]["status"], "COMPLETED");

    // COMPLETED is terminal.
    let (status, _) = send(
        app_router(&app),
        put_json(&uri, &token, &json!({ "status": "CANCELLED" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn strangers_cannot_touch_an_appointment() {
    let app = setup().await;
    let token = bearer(&app.customer, &app.secret);
    let body = booking_body(&app, "2030-01-07T10:00:00Z");

    let (_, created) = send(app_router(&app), post_json("/appointments", Some(&token), &body)).await;
    let uri = format!(
        "/appointments/{}",
        created["appointment"]["id"].as_str().unwrap()
    );

    let stranger = bearer(&TestUser::customer("stranger@example.com"), &app.secret);
    let (status, response) = send(app_router(&app), get_req(&uri, Some(&stranger))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(response["message"], "Access denied");

    // Provider and admin are both allowed.
    let provider_token = bearer(&app.provider, &app.secret);
    let (status, _) = send(app_router(&app), get_req(&uri, Some(&provider_token))).await;
    assert_eq!(status, StatusCode::OK);

    let admin = bearer(&TestUser::admin("admin@example.com"), &app.secret);
    let (status, _) = send(app_router(&app), get_req(&uri, Some(&admin))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn my_appointments_only_shows_the_callers() {
    let app = setup().await;
    let token = bearer(&app.customer, &app.secret);
    let other = TestUser::customer("other@example.com");
    let other_token = bearer(&other, &app.secret);

    let first = booking_body(&app, "2030-01-07T09:00:00Z");
    send(app_router(&app), post_json("/appointments", Some(&token), &first)).await;
    let second = booking_body(&app, "2030-01-07T10:00:00Z");
    send(
        app_router(&app),
        post_json("/appointments", Some(&other_token), &second),
    )
    .await;

    let (status, body) =
        send(app_router(&app), get_req("/appointments/my-appointments", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    let appointments = body["appointments"].as_array().unwrap();
    assert_eq!(appointments.len(), 1);
    assert_eq!(
        appointments[0]["userId"].as_str().unwrap(),
        app.customer.id
    );
    assert_eq!(body["pagination"]["total"], 1);
}

#[tokio::test]
async fn provider_listing_is_scoped_and_customer_is_denied() {
    let app = setup().await;
    let token = bearer(&app.customer, &app.secret);
    let body = booking_body(&app, "2030-01-07T10:00:00Z");
    send(app_router(&app), post_json("/appointments", Some(&token), &body)).await;

    let (status, _) = send(app_router(&app), get_req("/appointments", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let provider_token = bearer(&app.provider, &app.secret);
    let (status, listing) =
        send(app_router(&app), get_req("/appointments", Some(&provider_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["appointments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_bookings_admit_exactly_one() {
    let app = setup().await;
    let start = Utc.with_ymd_and_hms(2030, 1, 7, 10, 0, 0).unwrap();
    let date = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();

    let make_request = || BookAppointmentRequest {
        service_id: app.service_id,
        provider_id: app.provider.uuid(),
        date,
        start_time: start,
        notes: None,
    };

    let state_a = app.state.clone();
    let state_b = app.state.clone();
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();
    let request_a = make_request();
    let request_b = make_request();

    let (first, second) = tokio::join!(
        async move { BookingAdmission::new(&state_a).book(user_a, request_a).await },
        async move { BookingAdmission::new(&state_b).book(user_b, request_b).await },
    );

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let conflict = if first.is_ok() { second } else { first };
    assert!(matches!(conflict, Err(BookingError::SlotConflict)));

    // Exactly one row landed in the store.
    let stored = app
        .store
        .active_appointments_in_range(app.provider.uuid(), start, start + Duration::minutes(30))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn deleting_an_appointment_removes_it() {
    let app = setup().await;
    let token = bearer(&app.customer, &app.secret);
    let body = booking_body(&app, "2030-01-07T10:00:00Z");

    let (_, created) = send(app_router(&app), post_json("/appointments", Some(&token), &body)).await;
    let uri = format!(
        "/appointments/{}",
        created["appointment"]["id"].as_str().unwrap()
    );

    let delete = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .header("Authorization", &token)
        .body(Body::empty())
        .unwrap();
    let (status, response) = send(app_router(&app), delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["message"], "Appointment deleted successfully");

    let (status, _) = send(app_router(&app), get_req(&uri, Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn booking_validates_the_service() {
    let app = setup().await;
    let token = bearer(&app.customer, &app.secret);

    // Unknown service.
    let mut body = booking_body(&app, "2030-01-07T10:00:00Z");
    body["serviceId"] = json!(Uuid::new_v4());
    let (status, _) = send(app_router(&app), post_json("/appointments", Some(&token), &body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Inactive service looks exactly like a missing one.
    let inactive = Uuid::new_v4();
    app.store
        .seed_service(Service {
            id: inactive,
            provider_id: app.provider.uuid(),
            name: "Retired".to_string(),
            duration_minutes: 30,
            price: 10.0,
            is_active: false,
        })
        .await;
    let mut body = booking_body(&app, "2030-01-07T10:00:00Z");
    body["serviceId"] = json!(inactive);
    let (status, _) = send(app_router(&app), post_json("/appointments", Some(&token), &body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Service owned by a different provider.
    let mut body = booking_body(&app, "2030-01-07T10:00:00Z");
    body["providerId"] = json!(Uuid::new_v4());
    let (status, _) = send(app_router(&app), post_json("/appointments", Some(&token), &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rescheduling_rechecks_conflicts() {
    let app = setup().await;
    let token = bearer(&app.customer, &app.secret);

    let first = booking_body(&app, "2030-01-07T10:00:00Z");
    send(app_router(&app), post_json("/appointments", Some(&token), &first)).await;

    let second = booking_body(&app, "2030-01-07T11:00:00Z");
    let (_, second_created) =
        send(app_router(&app), post_json("/appointments", Some(&token), &second)).await;

    // Moving the second onto the first must fail.
    let uri = format!(
        "/appointments/{}",
        second_created["appointment"]["id"].as_str().unwrap()
    );
    let (status, response) = send(
        app_router(&app),
        put_json(&uri, &token, &json!({ "startTime": "2030-01-07T10:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "Time slot is already booked");

    // Moving it to a free slot succeeds and recomputes the end time.
    let (status, moved) = send(
        app_router(&app),
        put_json(&uri, &token, &json!({ "startTime": "2030-01-07T12:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        moved["appointment"]["endTime"].as_str().unwrap(),
        "2030-01-07T12:30:00Z"
    );
}

#[tokio::test]
async fn calendar_shows_the_booking_to_both_parties() {
    let app = setup().await;
    let customer_token = bearer(&app.customer, &app.secret);
    let provider_token = bearer(&app.provider, &app.secret);

    let body = booking_body(&app, "2030-01-07T10:00:00Z");
    let (status, _) = send(
        app_router(&app),
        post_json("/appointments", Some(&customer_token), &body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    for token in [&customer_token, &provider_token] {
        let (status, body) = send(
            app_router(&app),
            get_req("/calendar/events", Some(token)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let events = body["events"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["title"], "Haircut");
        assert_eq!(events[0]["start"], "2030-01-07T10:00:00Z");
        assert_eq!(events[0]["end"], "2030-01-07T10:30:00Z");
        assert_eq!(events[0]["status"], "PENDING");
        assert_eq!(events[0]["description"], "first visit");
    }
}

#[tokio::test]
async fn calendar_filters_by_date_window() {
    let app = setup().await;
    let token = bearer(&app.customer, &app.secret);

    for start in ["2030-01-07T10:00:00Z", "2030-01-07T14:00:00Z"] {
        let body = booking_body(&app, start);
        send(app_router(&app), post_json("/appointments", Some(&token), &body)).await;
    }

    let uri = "/calendar/events?startDate=2030-01-07T12:00:00Z&endDate=2030-01-07T23:00:00Z";
    let (status, body) = send(app_router(&app), get_req(uri, Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["start"], "2030-01-07T14:00:00Z");
}
