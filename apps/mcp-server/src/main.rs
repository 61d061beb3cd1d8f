use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{error, info, Level};

mod router;

use monitoring_cell::{fetch_health, HealthMonitorService};
use shared_config::{AppConfig, ServiceRole};
use shared_utils::telemetry::{init_tracing, shutdown_signal};

const ROLE: ServiceRole = ServiceRole::McpServer;

#[tokio::main]
async fn main() -> ExitCode {
    // Loading Env Vars
    dotenv().ok();
    init_tracing();

    let config = match AppConfig::from_env(ROLE) {
        Ok(config) => config,
        Err(e) => {
            error!(key = e.key(), "Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match std::env::args().nth(1).as_deref() {
        None | Some("run") => run(config).await,
        Some("healthcheck") => healthcheck(&config).await,
        Some(other) => {
            error!("Unknown command {:?}; expected `run` or `healthcheck`", other);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> ExitCode {
    info!("Starting {} with {:?}", ROLE, config);

    let state = Arc::new(config);
    let health = Arc::new(HealthMonitorService::for_backend(&state));

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(state.clone(), health)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], state.listen_port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Cannot bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    info!("Listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("{} stopped", ROLE);
    ExitCode::SUCCESS
}

async fn healthcheck(config: &AppConfig) -> ExitCode {
    let base_url = format!("http://127.0.0.1:{}", config.listen_port);
    let timeout = Duration::from_millis(config.health_probe_timeout_ms) * 2;

    match fetch_health(&base_url, timeout).await {
        Ok(report) => {
            println!("{}", serde_json::to_string(&report).unwrap_or_default());
            if report.status.is_healthy() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            println!("{}", serde_json::json!({ "status": "unhealthy", "error": e.to_string() }));
            ExitCode::FAILURE
        }
    }
}
