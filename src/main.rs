mod api_budget;
mod clock;
mod coach;
mod config;
mod error;
mod extractors;
mod middleware;
mod openapi;
mod quota;
mod routes;

use reqwest::Client;
use std::{sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::clock::{Clock, SystemClock};
use crate::coach::{AnthropicClient, CoachService, CoachSettings, CompletionClient};
use crate::config::AppConfig;
use crate::quota::{start_quota_sweep_task, UsageLimiter};

/// Shared HTTP client configuration. No overall request timeout is set; the
/// completion call waits as long as the transport allows.
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 5;
const HTTP_POOL_IDLE_TIMEOUT_SECS: u64 = 90;

#[derive(Clone)]
pub struct AppState {
    pub coach_service: Arc<CoachService>,
}

/// Create shared HTTP client with connection pooling
fn create_http_client() -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .pool_idle_timeout(Duration::from_secs(HTTP_POOL_IDLE_TIMEOUT_SECS))
        .pool_max_idle_per_host(10)
        .build()
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl+c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "study_coach=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;
    tracing::info!(
        daily_api_budget = config.daily_api_budget,
        user_hourly_limit = config.user_hourly_limit,
        kill_switch = config.api_kill_switch,
        model = %config.upstream.model,
        "Configuration loaded successfully"
    );
    if config.api_kill_switch {
        tracing::warn!("Kill switch is on; all generation requests will be refused");
    }

    // Create shared HTTP client with connection pooling
    let http_client = create_http_client()?;
    tracing::debug!("Shared HTTP client created");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let completion_client: Arc<dyn CompletionClient> = Arc::new(AnthropicClient::new(
        http_client,
        &config.upstream,
        &config.anthropic_api_key,
    ));

    // Counters live for the life of this process only
    let limiter = Arc::new(UsageLimiter::new(
        config.daily_api_budget,
        config.user_hourly_limit,
    ));
    start_quota_sweep_task(Arc::clone(&limiter), Arc::clone(&clock));

    let coach_service = Arc::new(CoachService::new(
        CoachSettings::from(&config),
        limiter,
        completion_client,
        clock,
    ));

    let state = AppState { coach_service };
    let app = routes::build_router(state);

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
