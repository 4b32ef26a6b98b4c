use axum::http::StatusCode;
use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static COFFEE_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "coffee_requests_total",
        "Catalog requests by operation and outcome",
        &["operation", "outcome"]
    )
    .expect("register coffee_requests_total")
});

/// Count one catalog request; the outcome label is derived from the status.
pub fn observe(operation: &str, status: StatusCode) {
    let outcome = match status.as_u16() {
        200..=299 => "ok",
        400 => "invalid",
        404 => "not_found",
        _ => "error",
    };
    COFFEE_REQUESTS_TOTAL.with_label_values(&[operation, outcome]).inc();
}

pub fn encode_metrics() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (StatusCode::OK, String::from_utf8(buffer).unwrap_or_default())
}
