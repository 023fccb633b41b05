//! Prometheus collectors for marketplace-social.

use actix_web::{HttpResponse, Responder};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

pub mod middleware;

pub use middleware::MetricsMiddleware;

lazy_static! {
    /// Follow operations by operation and outcome
    pub static ref FOLLOW_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "follow_operations_total",
        "Follow graph operations by outcome",
        &["operation", "outcome"]
    )
    .expect("follow_operations_total registers once");

    /// Review and reaction operations by operation and outcome
    pub static ref REVIEW_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "review_operations_total",
        "Review and reaction operations by outcome",
        &["operation", "outcome"]
    )
    .expect("review_operations_total registers once");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latency",
        &["method", "status"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("http_request_duration_seconds registers once");
}

pub fn record_follow(operation: &str, outcome: &str) {
    FOLLOW_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn record_review(operation: &str, outcome: &str) {
    REVIEW_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Serialise the default registry in the Prometheus text format.
pub async fn serve_metrics() -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode metrics");
            HttpResponse::InternalServerError().body(err.to_string())
        }
    }
}
