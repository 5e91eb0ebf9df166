use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers::{self, AppState};

/// Per-IP limit applied to form submissions.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    /// Seconds after which one request of the burst is replenished.
    pub replenish_secs: u64,
    pub burst: u32,
}

/// Builds the HTTP router.
///
/// Rate limiting keys on the client IP, so the server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()` when a limit is given.
pub fn build_router(state: Arc<AppState>, rate_limit: Option<RateLimit>) -> anyhow::Result<Router> {
    let max_body_bytes = state.config.max_body_bytes;

    let mut contact_routes = Router::new().route(
        "/api/contact",
        post(handlers::submit_contact).get(handlers::contact_liveness),
    );

    if let Some(limit) = rate_limit {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(limit.replenish_secs)
                .burst_size(limit.burst)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration: {:?}", limit))?,
        );
        contact_routes = contact_routes.layer(GovernorLayer {
            config: governor_conf,
        });
    }

    let contact_routes =
        contact_routes.layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(max_body_bytes)));

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(contact_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    Ok(app)
}
