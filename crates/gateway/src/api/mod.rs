pub mod chat;
pub mod health;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use aqm_domain::config::CorsConfig;

use crate::state::AppState;

/// Build the full API router, CORS included.
pub fn router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    Router::new()
        .route("/healthz", get(health::health))
        .route(
            "/v1/chat",
            post(chat::chat).fallback(chat::method_not_allowed),
        )
        .layer(cors)
        .with_state(state)
}

/// A literal `"*"` among the allowed origins opens the endpoint to any
/// origin; otherwise only the listed origins pass.
fn build_cors_layer(cfg: &CorsConfig) -> CorsLayer {
    let allow_origin = if cfg.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = cfg
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
