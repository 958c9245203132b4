/*!
 * Cross-cutting request handling: per-client rate limiting, request logging and
 * turning panics into JSON 500 responses.
 */

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, info};
use serde_json::json;
use std::any::Any;
use std::net::SocketAddr;
use std::time::Instant;

use super::AppState;
use crate::errors::ApiError;

/// Key used when the peer address is unknown (in-process requests)
const UNKNOWN_CLIENT: &str = "unknown";

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Reject clients that exceed their request budget with 429 and `retryAfter`
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = client_key(&request);

    match state.limiter.check(&key) {
        Ok(allowance) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("ratelimit-limit", HeaderValue::from(state.limiter.capacity()));
            headers.insert("ratelimit-remaining", HeaderValue::from(allowance.remaining));
            response
        }
        Err(wait) => {
            // round up so clients never retry early
            let retry_after = wait.as_millis().div_ceil(1000).max(1) as u64;
            info!("Rate limit exceeded for {}, retry after {}s", key, retry_after);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, HeaderValue::from(retry_after))],
                Json(json!({
                    "success": false,
                    "error": "Too many requests, please try again later.",
                    "retryAfter": retry_after,
                })),
            )
                .into_response()
        }
    }
}

/// Log method, path, status and latency of every request
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} {} {}ms",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

/// Render a caught panic as a 500 JSON response
pub fn panic_response(panic: Box<dyn Any + Send + 'static>, expose: bool) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Handler panicked: {}", message);

    ApiError::Internal { message, expose }.into_response()
}
