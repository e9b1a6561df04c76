/// Metrics and telemetry for the MedInventory client
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Backend API calls by endpoint and outcome
/// - Token refreshes
/// - Expiry polling and dashboard counts

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter_vec, register_int_gauge, Encoder, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== API Metrics ==========

    /// Backend API calls by endpoint and outcome
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "medinventory_api_requests_total",
        "Total number of backend API requests",
        &["endpoint", "outcome"]
    )
    .unwrap();

    /// Token refresh attempts by outcome
    pub static ref TOKEN_REFRESH_TOTAL: IntCounterVec = register_int_counter_vec!(
        "medinventory_token_refresh_total",
        "Total number of access token refresh attempts",
        &["outcome"]
    )
    .unwrap();

    // ========== Expiry Metrics ==========

    /// Expiry poll executions by outcome
    pub static ref EXPIRY_POLLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "medinventory_expiry_polls_total",
        "Total number of expiry poll executions",
        &["outcome"]
    )
    .unwrap();

    /// Items past their effective expiry date
    pub static ref EXPIRED_ITEMS: IntGauge = register_int_gauge!(
        "medinventory_expired_items",
        "Number of tracked items past their effective expiry date"
    )
    .unwrap();

    /// Items inside the 30-day window
    pub static ref EXPIRING_SOON_ITEMS: IntGauge = register_int_gauge!(
        "medinventory_expiring_soon_items",
        "Number of tracked items expiring within 30 days"
    )
    .unwrap();

    /// Items with alerts enabled
    pub static ref ALERTS_ENABLED_ITEMS: IntGauge = register_int_gauge!(
        "medinventory_alerts_enabled_items",
        "Number of tracked items with expiry alerts enabled"
    )
    .unwrap();
}

/// Record a backend API call
pub fn record_api_request(endpoint: &str, outcome: &str) {
    API_REQUESTS_TOTAL.with_label_values(&[endpoint, outcome]).inc();
}

/// Record a token refresh attempt
pub fn record_token_refresh(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    TOKEN_REFRESH_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record an expiry poll
pub fn record_poll(outcome: &str) {
    EXPIRY_POLLS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Publish the dashboard counts
pub fn set_expiry_counts(expired: usize, expiring_soon: usize, alerts_enabled: usize) {
    EXPIRED_ITEMS.set(expired as i64);
    EXPIRING_SOON_ITEMS.set(expiring_soon as i64);
    ALERTS_ENABLED_ITEMS.set(alerts_enabled as i64);
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
