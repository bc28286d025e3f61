//! Per-client sliding-window rate limiting.

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use tracing::warn;

use super::handlers::Envelope;
use crate::config::Config;
use crate::metrics;

const REJECTION_MESSAGE: &str = "Too many requests, please try again later.";

/// Rate limiter settings.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests allowed per client within one window.
    pub max_requests: usize,
    /// Sliding window length.
    pub window: Duration,
    /// Use the proxy-appended (last) X-Forwarded-For entry as the client address.
    pub trust_proxy: bool,
}

impl RateLimitConfig {
    /// Build from application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_requests: config.rate_limit_max_requests,
            window: config.rate_limit_window(),
            trust_proxy: config.trust_proxy,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Request admitted; this many remain in the current window.
    Allowed { remaining: usize },
    /// Request rejected; the oldest hit leaves the window after this long.
    Limited { retry_after: Duration },
}

/// Sliding-window log of request times per client address.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    hits: Arc<DashMap<IpAddr, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create a limiter with no recorded hits.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            hits: Arc::new(DashMap::new()),
        }
    }

    /// Limiter settings.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Record a request from `client` at the current instant.
    pub fn check(&self, client: IpAddr) -> Decision {
        self.check_at(client, Instant::now())
    }

    /// Record a request from `client` at `now`. Rejected requests are not
    /// recorded.
    pub fn check_at(&self, client: IpAddr, now: Instant) -> Decision {
        let window = self.config.window;
        let mut log = self.hits.entry(client).or_default();

        while log
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) >= window)
        {
            log.pop_front();
        }

        if log.len() >= self.config.max_requests {
            let retry_after = log
                .front()
                .map(|first| window.saturating_sub(now.saturating_duration_since(*first)))
                .unwrap_or(window);
            return Decision::Limited { retry_after };
        }

        log.push_back(now);
        Decision::Allowed {
            remaining: self.config.max_requests - log.len(),
        }
    }

    /// Forget clients with no hits inside the window.
    pub fn prune(&self) {
        let now = Instant::now();
        let window = self.config.window;
        self.hits.retain(|_, log| {
            log.back()
                .is_some_and(|last| now.saturating_duration_since(*last) < window)
        });
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.hits.len()
    }

    /// Resolve the client address for a request.
    ///
    /// Order: last X-Forwarded-For entry (when the one proxy in front is
    /// trusted), the socket peer, then 127.0.0.1. Earlier entries are
    /// written by the client and never used.
    pub fn client_ip(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
        if self.config.trust_proxy {
            let forwarded = headers
                .get_all("x-forwarded-for")
                .iter()
                .last()
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.rsplit(',').next())
                .and_then(|v| v.trim().parse().ok());
            if let Some(ip) = forwarded {
                return ip;
            }
        }

        peer.map(|addr| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }
}

/// Middleware rejecting clients that exceed their budget with a 429.
pub async fn enforce(State(limiter): State<RateLimiter>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let client = limiter.client_ip(request.headers(), peer);
    let limit = HeaderValue::from(limiter.config().max_requests);

    match limiter.check(client) {
        Decision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("ratelimit-limit", limit);
            headers.insert("ratelimit-remaining", HeaderValue::from(remaining));
            response
        }
        Decision::Limited { retry_after } => {
            warn!(client = %client, "rate limit exceeded");
            metrics::inc_rate_limited();

            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(Envelope::<()>::failure(REJECTION_MESSAGE)),
            )
                .into_response();
            let headers = response.headers_mut();
            headers.insert("ratelimit-limit", limit);
            headers.insert("ratelimit-remaining", HeaderValue::from(0u32));
            // round up so clients never retry early
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            headers.insert("retry-after", HeaderValue::from(secs));
            response
        }
    }
}
