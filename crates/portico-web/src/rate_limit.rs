//! Fixed-window rate limiting for form submissions.
//!
//! One counter per source address. When the window elapses every counter
//! is dropped at once, so a client can at worst double its budget across
//! a window boundary.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::WebError;
use crate::state::AppState;

#[derive(Debug)]
struct Window {
    started: Instant,
    visits: HashMap<IpAddr, u32>,
}

#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(Window {
                started: Instant::now(),
                visits: HashMap::new(),
            }),
        }
    }

    /// Count a request from `ip`. Returns `false` once the address has
    /// used up its budget for the current window.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut state = self.state.lock();
        if now.duration_since(state.started) > self.window {
            debug!(tracked = state.visits.len(), "rate limit window reset");
            state.visits.clear();
            state.started = now;
        }

        let count = state.visits.entry(ip).or_insert(0);
        *count = count.saturating_add(1);
        *count <= self.limit
    }
}

/// Source address of a request: the socket peer, or the first
/// `X-Forwarded-For` entry when the deployment trusts its proxy.
fn client_ip(request: &Request<Body>, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_for(request.headers()) {
            return ip;
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Middleware for form-submitting routes; answers 429 once the budget is
/// spent.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&request, state.config.trust_forwarded_for);
    if !state.rate_limiter.check(ip) {
        warn!(%ip, path = %request.uri().path(), "rate limit exceeded");
        return WebError::RateLimited.into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn allows_up_to_the_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(1), now));
        assert!(!limiter.check_at(ip(1), now));
    }

    #[test]
    fn addresses_are_counted_separately() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at(ip(1), now));
        assert!(!limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(2), now));
    }

    #[test]
    fn window_reset_clears_all_counters() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at(ip(1), start));
        assert!(!limiter.check_at(ip(1), start + Duration::from_secs(30)));
        assert!(limiter.check_at(ip(1), start + Duration::from_secs(61)));
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(forwarded_for(&headers), "203.0.113.7".parse().ok());
    }

    #[test]
    fn peer_address_is_used_by_default() {
        let mut request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        assert_eq!(client_ip(&request, false), "192.0.2.1".parse::<IpAddr>().unwrap());
        assert_eq!(client_ip(&request, true), "203.0.113.7".parse::<IpAddr>().unwrap());
    }
}
