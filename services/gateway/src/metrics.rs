//! Prometheus metrics for monitoring

use lazy_static::lazy_static;
use prometheus::{IntCounter, Registry};

lazy_static! {
    pub static ref BALANCE_QUERIES_TOTAL: IntCounter = IntCounter::new(
        "warriors_balance_queries_total",
        "Total number of balance queries served"
    )
    .expect("metric can be created");

    pub static ref BALANCE_FALLBACKS_TOTAL: IntCounter = IntCounter::new(
        "warriors_balance_fallbacks_total",
        "Balance queries answered with zero because the lookup failed"
    )
    .expect("metric can be created");

    pub static ref CLAIMS_SENT_TOTAL: IntCounter = IntCounter::new(
        "warriors_claims_sent_total",
        "Total number of claim messages accepted by the RPC endpoint"
    )
    .expect("metric can be created");

    pub static ref CLAIMS_FAILED_TOTAL: IntCounter = IntCounter::new(
        "warriors_claims_failed_total",
        "Total number of claims that could not be sent"
    )
    .expect("metric can be created");

    pub static ref WITHDRAW_PAYLOADS_TOTAL: IntCounter = IntCounter::new(
        "warriors_withdraw_payloads_total",
        "Total number of withdraw payloads built"
    )
    .expect("metric can be created");

    pub static ref KEEPALIVE_FAILURES_TOTAL: IntCounter = IntCounter::new(
        "warriors_keepalive_failures_total",
        "Self-pings that failed or returned a non-success status"
    )
    .expect("metric can be created");

    pub static ref CORS_REJECTIONS_TOTAL: IntCounter = IntCounter::new(
        "warriors_cors_rejections_total",
        "Requests refused because of their Origin header"
    )
    .expect("metric can be created");
}

pub fn init_metrics() -> prometheus::Result<Registry> {
    let registry = Registry::new();

    registry.register(Box::new(BALANCE_QUERIES_TOTAL.clone()))?;
    registry.register(Box::new(BALANCE_FALLBACKS_TOTAL.clone()))?;
    registry.register(Box::new(CLAIMS_SENT_TOTAL.clone()))?;
    registry.register(Box::new(CLAIMS_FAILED_TOTAL.clone()))?;
    registry.register(Box::new(WITHDRAW_PAYLOADS_TOTAL.clone()))?;
    registry.register(Box::new(KEEPALIVE_FAILURES_TOTAL.clone()))?;
    registry.register(Box::new(CORS_REJECTIONS_TOTAL.clone()))?;

    Ok(registry)
}
