use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderValue, header},
    middleware::Next,
    response::Response,
};
use std::{
    net::{IpAddr, SocketAddr},
    str::FromStr,
    time::Instant,
};
use tracing::{error, info, warn};

// Get client IP from proxy headers or connection info
pub fn get_client_ip(req: &Request) -> Option<IpAddr> {
    let forwarded = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|ip| IpAddr::from_str(ip.trim()).ok());
    if forwarded.is_some() {
        return forwarded;
    }

    let real_ip = req
        .headers()
        .get("X-Real-IP")
        .and_then(|value| value.to_str().ok())
        .and_then(|ip| IpAddr::from_str(ip.trim()).ok());
    if real_ip.is_some() {
        return real_ip;
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.ip())
}

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    // Responses carry tokens, never cache them
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    response
}

// Logging middleware with performance tracking
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let client = get_client_ip(&req)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let response = next.run(req).await;

    let duration_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if status < 400 {
        info!(%method, %path, %client, status, duration_ms, "Request completed");
    } else if status < 500 {
        warn!(%method, %path, %client, status, duration_ms, "Request completed with client error");
    } else {
        error!(%method, %path, %client, status, duration_ms, "Request completed with server error");
    }

    response
}
