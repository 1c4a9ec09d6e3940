use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

/// Key identifying a client for rate limiting.
///
/// The first `X-Forwarded-For` entry wins when `trust_forwarded_for` is set.
/// That header is client-controlled: only trust it behind a proxy that
/// overwrites it, or any client can pick its own bucket.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded_for: bool) -> String {
    // ---
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Admit the request only if the client's token bucket has a token.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    // ---
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(req.headers(), peer, state.trust_forwarded_for());

    if !state.rate_limiter().allow(&key) {
        tracing::warn!("Rate limit exceeded for {} on {}", key, req.uri().path());
        state.metrics().record_rate_limited(req.uri().path());
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please try again later.",
        )
            .into_response();
    }

    next.run(req).await
}

/// Record method, route and status of every request with its duration.
pub async fn track_http(State(state): State<AppState>, req: Request, next: Next) -> Response {
    // ---
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    state
        .metrics()
        .record_http_request(start, &path, &method, response.status().as_u16());
    response
}
