//! Middleware for bearer-token authentication and request logging

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::state::AppState;

/// Receives one record per handled request
pub trait RequestLogger: Send + Sync {
    fn log_request(&self, method: &Method, path: &str, status: StatusCode, latency: Duration);
}

/// Request logger emitting a `tracing` event
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRequestLogger;

impl RequestLogger for TracingRequestLogger {
    fn log_request(&self, method: &Method, path: &str, status: StatusCode, latency: Duration) {
        info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms = latency.as_millis() as u64,
            "Handled request"
        );
    }
}

/// Authenticate the request before it reaches a protected handler
///
/// On success the [`AuthenticatedIdentity`](crate::gate::AuthenticatedIdentity)
/// is inserted into the request extensions. Rejections never reach the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match state.gate.authenticate(req.headers()).await {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(rejection) => rejection.into_response(),
    };

    state
        .request_logger
        .log_request(&method, &path, response.status(), started.elapsed());
    response
}

/// Log public requests with the same collaborator the gate uses
pub async fn log_requests(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    state
        .request_logger
        .log_request(&method, &path, response.status(), started.elapsed());
    response
}
