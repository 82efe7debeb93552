use axum::{
    extract::{connect_info::ConnectInfo, Request},
    http::HeaderMap,
};
use std::net::{IpAddr, SocketAddr};

/// Extract client IP from proxy headers, falling back to the transport address.
pub fn extract_ip_from_headers(headers: &HeaderMap, fallback: Option<IpAddr>) -> Option<IpAddr> {
    if let Some(h) = headers.get("x-forwarded-for").and_then(|hv| hv.to_str().ok()) {
        if let Some(first) = h.split(',').next() {
            if let Ok(ip) = first.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }
    if let Some(h) = headers.get("x-real-ip").and_then(|hv| hv.to_str().ok()) {
        if let Ok(ip) = h.trim().parse::<IpAddr>() {
            return Some(ip);
        }
    }
    fallback
}

/// Client address for logging. Never fails: requests served without connect
/// info (tests, custom services) and without proxy headers yield `"unknown"`.
pub fn client_host(req: &Request) -> String {
    let remote = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|ConnectInfo(addr)| addr.ip());
    extract_ip_from_headers(req.headers(), remote)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
