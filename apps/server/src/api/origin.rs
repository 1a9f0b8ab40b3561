//! Origin-country guard for mutating routes.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::main_lib::AppState;

/// Client address: `X-Real-Ip`, then the first `X-Forwarded-For` entry,
/// then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(',').next().unwrap_or_default().trim().to_string())
            .filter(|value| !value.is_empty())
    };

    header("x-real-ip")
        .or_else(|| header("x-forwarded-for"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// Rejects the request with 401 unless the client IP resolves to the
/// configured origin country.
pub async fn require_origin(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let Some(ip) = client_ip(request.headers(), peer) else {
        return Err(ApiError::Unauthorized(
            "client address unavailable".to_string(),
        ));
    };

    match state.ip_location.country(&ip).await {
        Ok(country) if country == state.origin_country => Ok(next.run(request).await),
        Ok(country) => Err(ApiError::Unauthorized(format!(
            "request from {} located in {}",
            ip, country
        ))),
        Err(e) => Err(ApiError::Unauthorized(format!(
            "unable to locate {}: {}",
            ip, e
        ))),
    }
}
