use crate::errors::{AppError, RateLimitRejection};
use crate::observability::MetricsRecorder;
use crate::rate_limit::policy::Policy;
use crate::rate_limit::sliding_window::{RateLimitResult, SlidingWindowRateLimiter};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// A policy bound to one route, sharing the process-wide limiter
#[derive(Clone)]
pub struct RouteRateLimit {
    limiter: Arc<SlidingWindowRateLimiter>,
    policy: Policy,
    route: &'static str,
    trusted_proxies: Arc<[IpAddr]>,
}

impl RouteRateLimit {
    pub fn new(
        limiter: Arc<SlidingWindowRateLimiter>,
        policy: Policy,
        route: &'static str,
        trusted_proxies: Arc<[IpAddr]>,
    ) -> Self {
        Self {
            limiter,
            policy,
            route,
            trusted_proxies,
        }
    }
}

/// Rate limiting middleware.
///
/// Install with `axum::middleware::from_fn_with_state(route_limit, rate_limit_middleware)`.
pub async fn rate_limit_middleware(
    State(route_limit): State<RouteRateLimit>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identifier = extract_identifier(&request, &route_limit.trusted_proxies);

    let result = route_limit
        .limiter
        .check(&identifier, &route_limit.policy);

    MetricsRecorder::record_rate_limit_decision(route_limit.route, result.allowed);

    if !result.allowed {
        tracing::warn!(
            identifier = %identifier,
            route = route_limit.route,
            limit = result.limit,
            current = result.current,
            "Rate limit exceeded"
        );
        MetricsRecorder::record_rate_limit_exceeded(route_limit.route);

        return Err(AppError::RateLimitExceeded(RateLimitRejection {
            limit: result.limit,
            retry_after_secs: result.retry_after_secs().unwrap_or_default(),
            reset: result.reset.timestamp(),
            window: route_limit.policy.window_label(),
        }));
    }

    let mut response = next.run(request).await;
    add_rate_limit_headers(response.headers_mut(), &result);

    Ok(response)
}

/// Derive the rate limit key for a request.
///
/// The peer address is used unless it belongs to a trusted proxy, in which
/// case the forwarding headers name the client.
fn extract_identifier(request: &Request, trusted_proxies: &[IpAddr]) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    match peer {
        Some(ip) if trusted_proxies.contains(&ip) => {
            forwarded_ip(request.headers()).unwrap_or_else(|| ip.to_string())
        }
        Some(ip) => ip.to_string(),
        None => "unknown".to_string(),
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded_for.to_str() {
            if let Some(ip) = value.split(',').next().map(str::trim).filter(|s| !s.is_empty()) {
                return Some(ip.to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Advertise the remaining budget on admitted responses
fn add_rate_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(result.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(result.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(result.reset.timestamp()));
}
