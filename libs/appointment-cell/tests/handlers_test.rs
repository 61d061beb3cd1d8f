use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

use appointment_cell::models::{CANCELLED_MESSAGE, RESCHEDULED_MESSAGE, SCHEDULED_MESSAGE};
use appointment_cell::router::appointment_routes;
use shared_utils::extractor::{CALL_ID_HEADER, USER_ID_HEADER};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig, TEST_CARDIOLOGIST, TEST_CLINIC_NAME, TEST_DOCTOR};
use shared_utils::time::today_ist;

// 2030-03-04 is a Monday.
const MONDAY: &str = "2030-03-04";
const CALL_ID: &str = "call-abc";

fn app(mock_server: &MockServer) -> Router {
    appointment_routes(TestConfig::with_mock_server(&mock_server.uri()).backend())
}

fn tool_request(uri: &str, user_id: Option<&Uuid>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(CALL_ID_HEADER, CALL_ID);
    if let Some(user_id) = user_id {
        builder = builder.header(USER_ID_HEADER, user_id.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn result_text(response: axum::response::Response) -> String {
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["result"].as_str().unwrap().to_string()
}

async fn mount_clinic(mock_server: &MockServer, user_id: &Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_settings"))
        .and(query_param("user_id", format!("eq.{}", user_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_settings_response(&user_id.to_string())
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::profile_response(TEST_CLINIC_NAME)
        ])))
        .mount(mock_server)
        .await;
}

async fn mount_slot_holders(mock_server: &MockServer, time: &str, holders: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_details"))
        .and(query_param("appointment_time", format!("eq.{}", time)))
        .and(query_param("select", "appointment_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(holders))
        .mount(mock_server)
        .await;
}

async fn mount_booked_times(mock_server: &MockServer, booked: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_details"))
        .and(query_param("select", "appointment_time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(booked))
        .mount(mock_server)
        .await;
}

async fn mount_no_duplicate(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_details"))
        .and(query_param("call_id", format!("eq.{}", CALL_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;
}

async fn mount_numbering(mock_server: &MockServer, existing: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_details"))
        .and(query_param("appointment_id", "like.SMI-*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(existing))
        .mount(mock_server)
        .await;
}

fn schedule_body(time: &str) -> Value {
    json!({
        "patient_name": "Ravi Kumar",
        "assigned_doctor": TEST_DOCTOR,
        "appointment_date": MONDAY,
        "appointment_time": time,
        "appointment_reason": "Fever"
    })
}

fn stored(appointment_id: &str, user_id: &Uuid, time: &str, status: &str) -> Value {
    MockSupabaseResponses::appointment_response(appointment_id, &user_id.to_string(), TEST_DOCTOR, MONDAY, time, status)
}

// ==============================================================================
// SCHEDULING
// ==============================================================================

#[tokio::test]
async fn test_schedule_allocates_next_id_and_marks_call_booked() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;
    mount_slot_holders(&mock_server, "10:00:00", json!([])).await;
    mount_numbering(
        &mock_server,
        json!([{"appointment_id": "SMI-000041"}, {"appointment_id": "SMI-000007"}]),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointment_details"))
        .and(body_partial_json(json!({
            "appointment_id": "SMI-000042",
            "appointment_time": "10:00:00",
            "assigned_doctor": TEST_DOCTOR,
            "call_id": CALL_ID,
            "current_status": "scheduled"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            stored("SMI-000042", &user_id, "10:00:00", "scheduled")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/call_history"))
        .and(query_param("call_id", format!("eq.{}", CALL_ID)))
        .and(body_partial_json(json!({"appointment_status": "Booked"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app(&mock_server)
        .oneshot(tool_request("/schedule_appointment", Some(&user_id), schedule_body("10 AM")))
        .await
        .unwrap();

    assert_eq!(result_text(response).await, SCHEDULED_MESSAGE);
}

#[tokio::test]
async fn test_schedule_outside_clinic_hours_offers_openings() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;
    mount_booked_times(&mock_server, json!([])).await;

    let response = app(&mock_server)
        .oneshot(tool_request("/schedule_appointment", Some(&user_id), schedule_body("8:00 PM")))
        .await
        .unwrap();

    assert_eq!(
        result_text(response).await,
        "Doctor Dr. Asha Rao is not available at 8:00 PM on 2030-03-04 (outside working hours). \
         However, they have openings at: 9:00 AM, 9:30 AM, 10:00 AM, 10:30 AM. Would any of these times work for you?"
    );
}

#[tokio::test]
async fn test_schedule_during_lunch_is_outside_hours() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;
    mount_booked_times(&mock_server, json!([{"appointment_time": "09:00:00"}])).await;

    let response = app(&mock_server)
        .oneshot(tool_request("/schedule_appointment", Some(&user_id), schedule_body("13:30")))
        .await
        .unwrap();

    let text = result_text(response).await;
    assert!(text.contains("(outside working hours)"), "{}", text);
    assert!(text.contains("9:30 AM, 10:00 AM, 10:30 AM, 11:00 AM"), "{}", text);
}

#[tokio::test]
async fn test_schedule_on_doctors_day_off_asks_for_another_date() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;

    let body = json!({
        "patient_name": "Ravi Kumar",
        "assigned_doctor": TEST_CARDIOLOGIST,
        "appointment_date": "2030-03-05",
        "appointment_time": "11:00 AM",
        "appointment_reason": "Chest pain"
    });
    let response = app(&mock_server)
        .oneshot(tool_request("/schedule_appointment", Some(&user_id), body))
        .await
        .unwrap();

    assert_eq!(
        result_text(response).await,
        "Doctor Dr. Vikram Shah is not working on 2030-03-05. Please choose a different date."
    );
}

#[tokio::test]
async fn test_repeat_booking_on_same_call_is_not_inserted_twice() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;
    // The call's own earlier booking is what holds the slot.
    mount_slot_holders(&mock_server, "10:00:00", json!([{"appointment_id": "SMI-000042"}])).await;
    mount_booked_times(&mock_server, json!([{"appointment_time": "10:00:00"}])).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_details"))
        .and(query_param("call_id", format!("eq.{}", CALL_ID)))
        .and(query_param("patient_name", "eq.Ravi Kumar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            stored("SMI-000042", &user_id, "10:00:00", "scheduled")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointment_details"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let response = app(&mock_server)
        .oneshot(tool_request("/schedule_appointment", Some(&user_id), schedule_body("10:00")))
        .await
        .unwrap();

    assert_eq!(result_text(response).await, SCHEDULED_MESSAGE);
}

#[tokio::test]
async fn test_slot_held_by_another_call_offers_openings() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;
    mount_slot_holders(&mock_server, "10:00:00", json!([{"appointment_id": "SMI-000041"}])).await;
    mount_booked_times(&mock_server, json!([{"appointment_time": "10:00:00"}])).await;
    mount_no_duplicate(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointment_details"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let response = app(&mock_server)
        .oneshot(tool_request("/schedule_appointment", Some(&user_id), schedule_body("10:00 AM")))
        .await
        .unwrap();

    assert_eq!(
        result_text(response).await,
        "Doctor Dr. Asha Rao is not available at 10:00 AM on 2030-03-04. \
         However, they have openings at: 9:00 AM, 9:30 AM, 10:30 AM, 11:00 AM. Would any of these times work for you?"
    );
}

#[tokio::test]
async fn test_concurrent_insert_on_same_slot_is_reported_as_taken() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;
    mount_slot_holders(&mock_server, "10:00:00", json!([])).await;
    mount_no_duplicate(&mock_server).await;
    mount_numbering(&mock_server, json!([])).await;
    // Another worker booked 10:00 between the check and the insert.
    mount_booked_times(&mock_server, json!([{"appointment_time": "10:00:00"}])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointment_details"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::unique_violation(
            "appointment_details_scheduled_slot_key",
            "Key (user_id, assigned_doctor, appointment_date, appointment_time) already exists.",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/call_history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let response = app(&mock_server)
        .oneshot(tool_request("/schedule_appointment", Some(&user_id), schedule_body("10:00 AM")))
        .await
        .unwrap();

    assert_eq!(
        result_text(response).await,
        "Doctor Dr. Asha Rao is not available at 10:00 AM on 2030-03-04. \
         However, they have openings at: 9:00 AM, 9:30 AM, 10:30 AM, 11:00 AM. Would any of these times work for you?"
    );
}

/// Rejects the first insert with an id collision, accepts the next.
struct IdCollisionOnce {
    calls: AtomicUsize,
    accepted: Value,
}

impl Respond for IdCollisionOnce {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::unique_violation(
                "appointment_details_appointment_id_key",
                "Key (appointment_id)=(SMI-000001) already exists.",
            ))
        } else {
            ResponseTemplate::new(201).set_body_json(json!([self.accepted.clone()]))
        }
    }
}

#[tokio::test]
async fn test_id_collision_is_retried() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;
    mount_slot_holders(&mock_server, "10:00:00", json!([])).await;
    mount_numbering(&mock_server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointment_details"))
        .respond_with(IdCollisionOnce {
            calls: AtomicUsize::new(0),
            accepted: stored("SMI-000002", &user_id, "10:00:00", "scheduled"),
        })
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/call_history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let response = app(&mock_server)
        .oneshot(tool_request("/schedule_appointment", Some(&user_id), schedule_body("10 am")))
        .await
        .unwrap();

    assert_eq!(result_text(response).await, SCHEDULED_MESSAGE);
}

#[tokio::test]
async fn test_persistent_id_collisions_are_a_conflict() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;
    mount_slot_holders(&mock_server, "10:00:00", json!([])).await;
    mount_numbering(&mock_server, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointment_details"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::unique_violation(
            "appointment_details_appointment_id_key",
            "Key (appointment_id)=(SMI-000001) already exists.",
        )))
        .expect(3)
        .mount(&mock_server)
        .await;

    let response = app(&mock_server)
        .oneshot(tool_request("/schedule_appointment", Some(&user_id), schedule_body("10:00")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_doctor_is_spoken_back() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;

    let mut body = schedule_body("10:00");
    body["assigned_doctor"] = json!("Dr. Nobody");
    let response = app(&mock_server)
        .oneshot(tool_request("/schedule_appointment", Some(&user_id), body))
        .await
        .unwrap();

    assert!(result_text(response).await.contains("Dr. Nobody does not work at this clinic"));
}

#[tokio::test]
async fn test_missing_user_header_is_bad_request() {
    let mock_server = MockServer::start().await;

    let response = app(&mock_server)
        .oneshot(tool_request("/schedule_appointment", None, schedule_body("10:00")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unreadable_time_is_bad_request() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();

    let response = app(&mock_server)
        .oneshot(tool_request(
            "/schedule_appointment",
            Some(&user_id),
            schedule_body("sometime after lunch"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"]
        .as_str()
        .unwrap()
        .contains("sometime after lunch"));
}

#[tokio::test]
async fn test_database_outage_is_server_error() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_settings"))
        .respond_with(ResponseTemplate::new(500).set_body_json(MockSupabaseResponses::error_response(
            "internal error",
            "XX000",
        )))
        .mount(&mock_server)
        .await;

    let response = app(&mock_server)
        .oneshot(tool_request("/schedule_appointment", Some(&user_id), schedule_body("10:00")))
        .await
        .unwrap();

    assert!(response.status().is_server_error());
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[tokio::test]
async fn test_check_availability_reports_free_and_taken_slots() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;
    mount_slot_holders(&mock_server, "10:00:00", json!([])).await;
    mount_slot_holders(&mock_server, "11:00:00", json!([{"appointment_id": "SMI-000003"}])).await;

    let free = app(&mock_server)
        .oneshot(tool_request(
            "/check_availability",
            Some(&user_id),
            json!({"doctor_name": TEST_DOCTOR, "appointment_date": MONDAY, "appointment_time": "10:00"}),
        ))
        .await
        .unwrap();
    assert_eq!(
        result_text(free).await,
        "Doctor Dr. Asha Rao is available at 10:00 AM on 2030-03-04."
    );

    let taken = app(&mock_server)
        .oneshot(tool_request(
            "/check_availability",
            Some(&user_id),
            json!({"doctor_name": TEST_DOCTOR, "appointment_date": MONDAY, "appointment_time": "11 AM"}),
        ))
        .await
        .unwrap();
    assert_eq!(
        result_text(taken).await,
        "Doctor Dr. Asha Rao is not available at 11:00 AM on 2030-03-04."
    );
}

#[tokio::test]
async fn test_check_availability_outside_hours_has_no_openings_list() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;

    let response = app(&mock_server)
        .oneshot(tool_request(
            "/check_availability",
            Some(&user_id),
            json!({"doctor_name": TEST_DOCTOR, "appointment_date": MONDAY, "appointment_time": "7:30 AM"}),
        ))
        .await
        .unwrap();

    assert_eq!(
        result_text(response).await,
        "Doctor Dr. Asha Rao is not available at 7:30 AM on 2030-03-04 (outside working hours)."
    );
}

#[tokio::test]
async fn test_available_slots_are_database_times() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;
    mount_booked_times(&mock_server, json!([{"appointment_time": "09:30:00"}])).await;

    let response = app(&mock_server)
        .oneshot(tool_request(
            "/get_available_slots",
            Some(&user_id),
            json!({"doctor_name": TEST_DOCTOR, "appointment_date": MONDAY}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["result"],
        json!(["09:00:00", "10:00:00", "10:30:00", "11:00:00"])
    );
}

// ==============================================================================
// CHANGES
// ==============================================================================

async fn mount_existing(mock_server: &MockServer, appointment: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_details"))
        .and(query_param("appointment_id", "eq.SMI-000003"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_reschedule_moves_appointment_when_unchanged() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;
    mount_existing(&mock_server, stored("SMI-000003", &user_id, "10:00:00", "scheduled")).await;
    mount_slot_holders(&mock_server, "11:00:00", json!([])).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointment_details"))
        .and(query_param("appointment_time", "eq.10:00:00"))
        .and(query_param("current_status", "eq.scheduled"))
        .and(body_partial_json(json!({"appointment_time": "11:00:00"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            stored("SMI-000003", &user_id, "11:00:00", "scheduled")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app(&mock_server)
        .oneshot(tool_request(
            "/reschedule_appointment",
            Some(&user_id),
            json!({"appointment_id": "SMI-000003", "new_date": MONDAY, "new_time": "11:00 AM"}),
        ))
        .await
        .unwrap();

    assert_eq!(result_text(response).await, RESCHEDULED_MESSAGE);
}

#[tokio::test]
async fn test_reschedule_of_concurrently_changed_appointment_is_rejected() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;
    mount_existing(&mock_server, stored("SMI-000003", &user_id, "10:00:00", "scheduled")).await;
    mount_slot_holders(&mock_server, "11:00:00", json!([])).await;

    // The guarded update matched nothing: the row moved after it was read.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointment_details"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app(&mock_server)
        .oneshot(tool_request(
            "/reschedule_appointment",
            Some(&user_id),
            json!({"appointment_id": "SMI-000003", "new_date": MONDAY, "new_time": "11:00"}),
        ))
        .await
        .unwrap();

    assert_eq!(
        result_text(response).await,
        "Appointment SMI-000003 was changed by another request. Please check its details and try again."
    );
}

#[tokio::test]
async fn test_reschedule_of_unknown_appointment() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_details"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let response = app(&mock_server)
        .oneshot(tool_request(
            "/reschedule_appointment",
            Some(&user_id),
            json!({"appointment_id": "SMI-000999", "new_date": MONDAY, "new_time": "11:00"}),
        ))
        .await
        .unwrap();

    assert_eq!(result_text(response).await, "Appointment not found for rescheduling.");
}

#[tokio::test]
async fn test_cancel_is_conditional_on_scheduled_status() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_clinic(&mock_server, &user_id).await;
    mount_existing(&mock_server, stored("SMI-000003", &user_id, "10:00:00", "scheduled")).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointment_details"))
        .and(query_param("current_status", "eq.scheduled"))
        .and(body_partial_json(json!({"current_status": "cancelled"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            stored("SMI-000003", &user_id, "10:00:00", "cancelled")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app(&mock_server)
        .oneshot(tool_request(
            "/cancel_appointment",
            Some(&user_id),
            json!({"appointment_id": "SMI-000003"}),
        ))
        .await
        .unwrap();

    assert_eq!(result_text(response).await, CANCELLED_MESSAGE);
}

#[tokio::test]
async fn test_cancel_twice_is_reported() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_existing(&mock_server, stored("SMI-000003", &user_id, "10:00:00", "cancelled")).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointment_details"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let response = app(&mock_server)
        .oneshot(tool_request(
            "/cancel_appointment",
            Some(&user_id),
            json!({"appointment_id": "SMI-000003"}),
        ))
        .await
        .unwrap();

    assert_eq!(
        result_text(response).await,
        "Appointment SMI-000003 has already been cancelled."
    );
}

// ==============================================================================
// LOOKUPS
// ==============================================================================

#[tokio::test]
async fn test_list_appointments_starts_today_in_clinic_time() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_details"))
        .and(query_param("user_id", format!("eq.{}", user_id)))
        .and(query_param("patient_name", "eq.Ravi Kumar"))
        .and(query_param("appointment_date", format!("gte.{}", today_ist())))
        .and(query_param("current_status", "eq.scheduled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            stored("SMI-000003", &user_id, "10:00:00", "scheduled"),
            stored("SMI-000004", &user_id, "11:00:00", "scheduled")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app(&mock_server)
        .oneshot(tool_request(
            "/list_appointments_for_patient",
            Some(&user_id),
            json!({"patient_name": "Ravi Kumar"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["result"].as_array().unwrap().len(), 2);
    assert_eq!(body["result"][0]["appointment_id"], "SMI-000003");
    assert_eq!(body["result"][1]["appointment_time"], "11:00:00");
}

#[tokio::test]
async fn test_appointment_details_filters_are_optional() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment_details"))
        .and(query_param("user_id", format!("eq.{}", user_id)))
        .and(query_param("assigned_doctor", format!("eq.{}", TEST_DOCTOR)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            stored("SMI-000003", &user_id, "10:00:00", "scheduled")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app(&mock_server)
        .oneshot(tool_request(
            "/get_appointment_details",
            Some(&user_id),
            json!({"assigned_doctor": TEST_DOCTOR, "patient_name": ""}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["result"][0]["assigned_doctor"], TEST_DOCTOR);
}
