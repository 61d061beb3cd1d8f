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

use monitoring_cell::fetch_health;
use session_registry_cell::connect_registry;
use shared_config::{AppConfig, ServiceRole};
use shared_utils::telemetry::{init_tracing, shutdown_signal};
use voice_agent_cell::handlers::VoiceAgentHandlers;
use voice_agent_cell::{worker_health_monitor, LiveKitWebhooks, SessionManager};

const ROLE: ServiceRole = ServiceRole::VoiceWorker;

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
    info!("Starting {} {} with {:?}", ROLE, config.worker_id, config);

    let registry = match connect_registry(&config).await {
        Ok(registry) => registry,
        Err(e) => {
            error!("Session registry unavailable: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let sessions = Arc::new(SessionManager::new(&config, registry.clone()));
    let heartbeat = sessions.spawn_heartbeat();

    let handlers = Arc::new(VoiceAgentHandlers::new(sessions.clone(), LiveKitWebhooks::new(&config)));
    let health = Arc::new(worker_health_monitor(&config, registry));

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(handlers, health)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Cannot bind {}: {}", addr, e);
            heartbeat.stop().await;
            return ExitCode::FAILURE;
        }
    };
    info!("Listening on {}", addr);

    let served = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await;

    heartbeat.stop().await;
    sessions.shutdown().await;

    if let Err(e) = served {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("{} {} stopped", ROLE, sessions.worker_id());
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
