use std::env;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::extract::connect_info::ConnectInfo;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};

use crate::SharedState;
use crate::error::ApiError;

type PerIpLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock, NoOpMiddleware>;

pub const DEFAULT_PER_SEC: u64 = 20;
pub const DEFAULT_BURST: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_sec: u64,
    pub burst: u32,
}

impl RateLimitConfig {
    /// `IR_RATE_LIMIT_GLOBAL_PER_SEC` / `IR_RATE_LIMIT_GLOBAL_BURST`; zero or
    /// unparsable values keep the defaults.
    pub fn from_env() -> Self {
        Self {
            per_sec: positive_env("IR_RATE_LIMIT_GLOBAL_PER_SEC").unwrap_or(DEFAULT_PER_SEC),
            burst: positive_env("IR_RATE_LIMIT_GLOBAL_BURST").unwrap_or(DEFAULT_BURST),
        }
    }
}

fn positive_env<T>(name: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .filter(|value| *value > T::default())
}

/// Token bucket per client address, shared by every route.
#[derive(Clone)]
pub struct ProfileRateLimiter {
    limiter: Arc<PerIpLimiter>,
}

impl ProfileRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let period = Duration::from_nanos((1_000_000_000 / config.per_sec.max(1)).max(1));
        let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }

    /// Requests without a peer address (in-process tests) are not limited.
    pub fn admit(&self, peer: Option<IpAddr>) -> Result<(), ApiError> {
        match peer {
            Some(ip) if self.limiter.check_key(&ip).is_err() => Err(ApiError::RateLimited),
            _ => Ok(()),
        }
    }
}

pub async fn limit_by_peer(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    state.rate_limiter.admit(peer)?;
    Ok(next.run(req).await)
}
