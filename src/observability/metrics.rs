use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "status"]
    )
    .unwrap()
});

static RATE_LIMIT_DECISIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "rate_limit_decisions_total",
        "Total number of rate limit admission decisions",
        &["route", "decision"]
    )
    .unwrap()
});

static RATE_LIMIT_EXCEEDED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "rate_limit_exceeded_total",
        "Total number of rate limit violations",
        &["route"]
    )
    .unwrap()
});

static RATE_LIMIT_TRACKED_KEYS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "rate_limit_tracked_keys",
        "Number of client keys held by the rate limiter after the last sweep"
    )
    .unwrap()
});

static RATE_LIMIT_SWEPT_KEYS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "rate_limit_swept_keys_total",
        "Total number of idle client keys evicted by the sweeper"
    )
    .unwrap()
});

pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn record_http_request(method: &str, status: u16) {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&[method, &status.to_string()])
            .inc();
    }

    pub fn record_rate_limit_decision(route: &str, allowed: bool) {
        let decision = if allowed { "admitted" } else { "rejected" };
        RATE_LIMIT_DECISIONS_TOTAL
            .with_label_values(&[route, decision])
            .inc();
    }

    pub fn record_rate_limit_exceeded(route: &str) {
        RATE_LIMIT_EXCEEDED_TOTAL.with_label_values(&[route]).inc();
    }

    pub fn set_tracked_keys(count: i64) {
        RATE_LIMIT_TRACKED_KEYS.set(count);
    }

    pub fn record_swept_keys(count: u64) {
        RATE_LIMIT_SWEPT_KEYS_TOTAL.inc_by(count);
    }

    /// Export all metrics in Prometheus format
    pub fn export() -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        encoder.encode_to_string(&metric_families)
    }
}
