//! Prometheus metrics for the credential service.
//!
//! Counters and histograms live in the default registry and are exposed on
//! `GET /metrics`.

use crate::error::CredentialError;
use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder};

/// Access tokens issued.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "credential_tokens_issued_total",
        "Total number of access tokens issued",
        &["algorithm"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Refresh exchanges by outcome.
pub static REFRESH_EXCHANGES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "credential_refresh_exchanges_total",
        "Total number of refresh token exchanges",
        &["status"]
    )
    .expect("Failed to register refresh_exchanges metric")
});

/// Opaque token confirmations by kind and outcome.
pub static CONFIRMATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "credential_confirmations_total",
        "Total number of opaque token confirmations",
        &["kind", "status"]
    )
    .expect("Failed to register confirmations metric")
});

/// HTTP handler latency.
pub static HTTP_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "credential_http_latency_seconds",
        "HTTP handler latency in seconds",
        &["route"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register http_latency metric")
});

/// Record an access token issuance.
pub fn record_token_issued(algorithm: &str) {
    TOKENS_ISSUED.with_label_values(&[algorithm]).inc();
}

/// Record a refresh exchange outcome.
pub fn record_refresh_exchange(status: &str) {
    REFRESH_EXCHANGES.with_label_values(&[status]).inc();
}

/// Record a confirmation outcome.
pub fn record_confirmation(kind: &str, confirmed: bool) {
    let status = if confirmed { "confirmed" } else { "not_confirmed" };
    CONFIRMATIONS.with_label_values(&[kind, status]).inc();
}

/// Record handler latency.
pub fn record_http_latency(route: &str, duration_secs: f64) {
    HTTP_LATENCY.with_label_values(&[route]).observe(duration_secs);
}

/// Text exposition of every registered metric.
pub fn render() -> Result<String, CredentialError> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| CredentialError::internal(format!("Metrics encoding failed: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| CredentialError::internal(format!("Metrics encoding failed: {}", e)))
}
