use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clinic_cell::models::ClinicError;
use clinic_cell::services::ClinicSettingsService;
use shared_database::SupabaseClient;
use shared_utils::test_utils::MockSupabaseResponses;

fn service(mock_server: &MockServer) -> ClinicSettingsService {
    ClinicSettingsService::with_client(Arc::new(SupabaseClient::with_credentials(
        &mock_server.uri(),
        "test-service-key",
    )))
}

#[tokio::test]
async fn test_clinic_prefix_is_first_three_letters_upper_cased() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(query_param("id", format!("eq.{}", user_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::profile_response("smile care clinic")
        ])))
        .mount(&mock_server)
        .await;

    let prefix = service(&mock_server).get_clinic_prefix(&user_id).await.unwrap();
    assert_eq!(prefix.as_deref(), Some("SMI"));
}

#[tokio::test]
async fn test_short_or_missing_clinic_name_has_no_prefix() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "AB"}])))
        .mount(&mock_server)
        .await;

    assert_eq!(service(&mock_server).get_clinic_prefix(&user_id).await.unwrap(), None);
}

#[tokio::test]
async fn test_ambiguous_agent_phone_resolves_to_nobody() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"user_id": Uuid::new_v4()},
            {"user_id": Uuid::new_v4()}
        ])))
        .mount(&mock_server)
        .await;

    let resolved = service(&mock_server)
        .get_user_id_by_agent_phone("+912269539733")
        .await
        .unwrap();
    assert!(resolved.is_none());
}

#[tokio::test]
async fn test_require_user_settings_reports_missing_clinic() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let err = service(&mock_server)
        .require_user_settings(&Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, ClinicError::SettingsNotFound(_));
}
