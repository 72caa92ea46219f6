// HTTP layer - axum routers for every resource under /api

pub mod activity_logs;
pub mod analytics;
pub mod dashboard;
pub mod events;
pub mod extract;
pub mod members;
pub mod organizations;
pub mod params;
pub mod response;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::infrastructure::middleware::{
    request_context_middleware, ACTOR_HEADER, REQUEST_ID_HEADER,
};

pub use response::ApiResponse;

pub fn cors_layer(frontend_origin: &str) -> CorsLayer {
    if frontend_origin.trim() == "*" {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = frontend_origin
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(ACTOR_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(Duration::from_secs(60 * 60))
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(dashboard::health))
        .route("/dashboard", get(dashboard::dashboard))
        .nest("/organizations", organizations::routes())
        .nest("/members", members::routes())
        .nest("/events", events::routes())
        .nest("/activity-logs", activity_logs::routes())
        .nest("/analytics", analytics::routes());

    let cors = cors_layer(&state.config.server.frontend_origin);

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(middleware::from_fn(request_context_middleware))
        .layer(cors)
        .with_state(state)
}
