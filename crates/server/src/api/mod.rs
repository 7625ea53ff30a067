pub mod error;
pub mod health;
pub mod middleware;
pub mod step;
pub mod types;
pub mod validation;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tokenlens_core::step::StepEngine;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<StepEngine>,
    /// Label reported in `model_info` and `/healthz`.
    pub model_name: String,
    pub provider: String,
    pub vocab_size: usize,
}

impl AppState {
    pub fn new(engine: Arc<StepEngine>, model_name: String, provider: String) -> Self {
        let vocab_size = engine.vocab_size();
        Self {
            engine,
            model_name,
            provider,
            vocab_size,
        }
    }
}

/// Configuration for CORS middleware.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Comma-separated allowed origins, or "*" for all.
    pub allowed_origins: String,
    /// Comma-separated allowed methods.
    pub allowed_methods: String,
    /// Comma-separated allowed headers, or "*" for all.
    pub allowed_headers: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: "*".to_string(),
            allowed_methods: "GET,POST,OPTIONS".to_string(),
            allowed_headers: "*".to_string(),
        }
    }
}

/// Build a `CorsLayer` from a `CorsConfig`.
///
/// With the wildcard defaults this is `CorsLayer::very_permissive()`;
/// otherwise each field is parsed into its typed list.
pub fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins == "*"
        && config.allowed_headers == "*"
        && config.allowed_methods == "GET,POST,OPTIONS"
    {
        return CorsLayer::very_permissive();
    }

    let mut layer = CorsLayer::new();

    if config.allowed_origins == "*" {
        layer = layer.allow_origin(AllowOrigin::any());
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                HeaderValue::from_str(trimmed).ok()
            })
            .collect();
        layer = layer.allow_origin(origins);
    }

    let methods: Vec<Method> = config
        .allowed_methods
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<Method>().ok()
        })
        .collect();
    layer = layer.allow_methods(AllowMethods::list(methods));

    if config.allowed_headers == "*" {
        layer = layer.allow_headers(AllowHeaders::any());
    } else {
        let headers: Vec<HeaderName> = config
            .allowed_headers
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<HeaderName>().ok()
            })
            .collect();
        layer = layer.allow_headers(AllowHeaders::list(headers));
    }

    layer
}

pub fn create_router(state: AppState) -> Router {
    create_router_with_cors(state, CorsLayer::very_permissive())
}

pub fn create_router_with_cors(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/step", post(step::step))
        .route("/next_dist", post(step::next_dist))
        .route("/healthz", get(health::healthz))
        .layer(axum::middleware::from_fn(middleware::add_contract_version))
        .layer(cors)
        .with_state(state)
}
