use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lead_intake_api::app::{build_router, RateLimit};
use lead_intake_api::config::Config;
use lead_intake_api::crm_client::CrmClient;
use lead_intake_api::handlers::AppState;
use lead_intake_api::pipeline::LeadPipeline;

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - The CRM client (skipped when no token is configured).
/// - HTTP routes and middleware (CORS, body limit, rate limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_intake_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Without a token the server still starts; submissions answer 500 until one is set.
    let crm_client = match &config.crm_token {
        Some(token) => match CrmClient::new(
            config.crm_base_url.clone(),
            token.clone(),
            config.crm_api_version.clone(),
            Duration::from_secs(config.crm_timeout_secs),
        ) {
            Ok(client) => {
                tracing::info!("✓ CRM client initialized: {}", config.crm_base_url);
                Some(client)
            }
            Err(e) => {
                tracing::error!("Failed to initialize CRM client: {}", e);
                None
            }
        },
        None => {
            tracing::warn!("CRM_ACCESS_TOKEN is not set; contact submissions will fail");
            None
        }
    };

    let rate_limit = RateLimit {
        replenish_secs: config.rate_limit_replenish_secs,
        burst: config.rate_limit_burst,
    };
    let port = config.port;

    // Build application state
    let app_state = Arc::new(AppState {
        pipeline: LeadPipeline::new(crm_client, config.crm_lead_tag.clone()),
        config,
    });

    let app = build_router(app_state, Some(rate_limit))?;

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
