use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use call_history_cell::router::call_history_routes;
use clinic_cell::router::clinic_routes;
use monitoring_cell::{create_monitoring_router, HealthMonitorService};
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>, health: Arc<HealthMonitorService>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic appointment backend is running!" }))
        .merge(appointment_routes(state.clone()))
        .merge(clinic_routes(state.clone()))
        .merge(call_history_routes(state))
        .merge(create_monitoring_router(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use shared_utils::test_utils::TestConfig;
    use tower::ServiceExt;
    use wiremock::MockServer;

    fn app(mock_server: &MockServer) -> Router {
        let config = TestConfig::with_mock_server(&mock_server.uri()).backend();
        let health = Arc::new(HealthMonitorService::for_backend(&config));
        create_router(config, health)
    }

    #[tokio::test]
    async fn test_banner() {
        let mock_server = MockServer::start().await;
        let response = app(&mock_server)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Clinic appointment backend is running!");
    }

    #[tokio::test]
    async fn test_tool_routes_are_mounted() {
        let mock_server = MockServer::start().await;
        // No identity headers: the route exists and rejects the request.
        let response = app(&mock_server)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/get_user_settings")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_ne!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_liveness_is_mounted() {
        let mock_server = MockServer::start().await;
        let response = app(&mock_server)
            .oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
