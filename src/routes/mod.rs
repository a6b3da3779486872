// Route modules
pub mod admin;
pub mod campaigns;
pub mod wallet;

use crate::{
    app_state::AppState,
    middleware::{create_rate_limiter, jwt_auth_middleware, logging_middleware},
    models::common::MessageResponse,
};
use axum::{
    http::{HeaderValue, Method, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);
    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1_routes(state.clone()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(cors)
        .with_state(state)
}

/// GET /health
async fn health() -> Json<MessageResponse> {
    Json(MessageResponse::new("ok"))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

/// API v1 routes
fn api_v1_routes(state: AppState) -> Router<AppState> {
    // User-facing mutations: authenticated and rate limited
    let mut protected_routes = Router::new()
        .route("/campaigns/launch", post(campaigns::launch_campaign))
        .route("/participations/{id}/tier", post(campaigns::change_tier))
        .route(
            "/participations/{id}/pause",
            post(campaigns::pause_participation),
        )
        .route(
            "/participations/{id}/resume",
            post(campaigns::resume_participation),
        );

    if state.config.rate_limit.enabled {
        let rate_limiter = create_rate_limiter(state.redis.clone(), &state.config.rate_limit);
        protected_routes = protected_routes.route_layer(middleware::from_fn(rate_limiter));
    } else {
        tracing::warn!("Rate limiting is disabled");
    }

    // The rate limiter reads the identity, so authentication wraps it
    let protected_routes = protected_routes.layer(middleware::from_fn_with_state(
        state.clone(),
        jwt_auth_middleware,
    ));

    // Auth-only routes (no rate limiting, require JWT)
    let auth_only_routes = Router::new()
        .route("/wallet", get(wallet::get_wallet))
        .route("/wallet/transactions", get(wallet::list_transactions))
        .route("/campaign-templates", get(campaigns::list_templates))
        .route("/campaigns/quote", get(campaigns::quote_launch))
        .route("/participations", get(campaigns::list_participations))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    // Admin routes; the handlers' AdminIdentity extractor enforces the role
    let admin_routes = Router::new()
        .route("/admin/wallets/{user_id}/top-up", post(admin::top_up))
        .route("/admin/wallets/{user_id}/deduct", post(admin::deduct))
        .route("/admin/campaign-templates", post(admin::create_template))
        .route(
            "/admin/campaign-templates/{id}/deactivate",
            post(admin::deactivate_template),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    Router::new()
        .merge(protected_routes)
        .merge(auth_only_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(logging_middleware))
}
