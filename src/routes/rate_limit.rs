use anyhow::anyhow;
use axum::Router;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tracing::info;

/// Rates at or above this many requests per second turn rate limiting off.
pub const RATE_LIMIT_DISABLED_AT: u32 = 100_000;

/// Time between two replenished request tokens for `requests_per_second`.
pub fn replenish_interval_nanos(requests_per_second: u32) -> u64 {
    1_000_000_000 / u64::from(requests_per_second.max(1))
}

/// Wrap `router` in a per-IP rate limiter allowing `requests_per_second`
/// sustained, with bursts of up to `burst_size` requests.
pub fn rate_limited(
    router: Router,
    requests_per_second: u32,
    burst_size: u32,
) -> anyhow::Result<Router> {
    if requests_per_second >= RATE_LIMIT_DISABLED_AT {
        info!("Rate limiting disabled (rate >= {RATE_LIMIT_DISABLED_AT}/s)");
        return Ok(router);
    }

    let governor_config = GovernorConfigBuilder::default()
        .per_nanosecond(replenish_interval_nanos(requests_per_second))
        .burst_size(burst_size)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("Failed to build rate limiter config"))?;

    info!("Rate limiting: {requests_per_second} requests/s per IP, burst {burst_size}");
    Ok(router.layer(GovernorLayer::new(governor_config)))
}
