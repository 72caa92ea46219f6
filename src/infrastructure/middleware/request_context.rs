// Request context middleware - assigns a request id, resolves the acting
// user and logs each request on completion

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

pub const ACTOR_HEADER: &str = "x-user-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const SYSTEM_ACTOR: &str = "system";

/// Per-request identity injected into request extensions for handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    /// Recorded as `createdBy` / `userId` on writes
    pub actor: String,
}

impl RequestContext {
    pub fn system() -> Self {
        Self {
            request_id: format!("system-{}", Uuid::new_v4()),
            actor: SYSTEM_ACTOR.to_string(),
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let actor = headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(SYSTEM_ACTOR)
            .to_string();

        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= 128)
            .map(str::to_string)
            .unwrap_or_else(|| format!("req-{}", Uuid::new_v4()));

        Self { request_id, actor }
    }
}

pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
    let context = RequestContext::from_headers(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    request.extensions_mut().insert(context.clone());
    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&context.request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    info!(
        request_id = %context.request_id,
        actor = %context.actor,
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, HeaderValue::from_static(" admin-7 "));

        let context = RequestContext::from_headers(&headers);
        assert_eq!(context.actor, "admin-7");
        assert!(context.request_id.starts_with("req-"));
    }

    #[test]
    fn test_anonymous_request_is_system() {
        let context = RequestContext::from_headers(&HeaderMap::new());
        assert_eq!(context.actor, SYSTEM_ACTOR);
    }

    #[test]
    fn test_incoming_request_id_is_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("trace-42"));

        let context = RequestContext::from_headers(&headers);
        assert_eq!(context.request_id, "trace-42");
    }
}
