//! Prometheus metrics for relationship-service.
//!
//! Every graph operation is counted by outcome and timed; cascading deletes also report how
//! many dependents they removed.

use crate::error::ServiceResult;
use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::future::Future;
use std::time::{Duration, Instant};

/// Total graph operations by operation and status (ok or error kind)
static GRAPH_OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "relationship_graph_operations_total",
        "Total relationship graph operations by outcome",
        &["operation", "status"]
    )
    .expect("failed to register relationship_graph_operations_total")
});

static GRAPH_OPERATION_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "relationship_graph_operation_duration_seconds",
        "Duration of relationship graph operations",
        &["operation"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    )
    .expect("failed to register relationship_graph_operation_duration_seconds")
});

/// Dependents removed by cascading comment deletes
static CASCADE_REMOVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "relationship_graph_cascade_removed_total",
        "Entities removed by cascading comment deletes",
        &["entity"]
    )
    .expect("failed to register relationship_graph_cascade_removed_total")
});

pub fn record_operation(operation: &str, status: &str, duration: Duration) {
    GRAPH_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
    GRAPH_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

pub fn record_cascade_removed(entity: &str, count: u64) {
    if count > 0 {
        CASCADE_REMOVED_TOTAL.with_label_values(&[entity]).inc_by(count);
    }
}

/// Await `fut` and record its outcome under `operation`
pub async fn track<T, F>(operation: &'static str, fut: F) -> ServiceResult<T>
where
    F: Future<Output = ServiceResult<T>>,
{
    let start = Instant::now();
    let result = fut.await;
    let status = match &result {
        Ok(_) => "ok",
        Err(err) => err.kind(),
    };
    record_operation(operation, status, start.elapsed());
    result
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    #[tokio::test]
    async fn test_track_counts_outcomes() {
        let ok: ServiceResult<i32> = track("metrics_test_op", async { Ok(1) }).await;
        assert_eq!(ok.unwrap(), 1);

        let err: ServiceResult<i32> = track("metrics_test_op", async {
            Err(ServiceError::CommentNotFound(9))
        })
        .await;
        assert!(err.is_err());

        let ok_count = GRAPH_OPERATIONS_TOTAL
            .with_label_values(&["metrics_test_op", "ok"])
            .get();
        let err_count = GRAPH_OPERATIONS_TOTAL
            .with_label_values(&["metrics_test_op", "comment_not_found"])
            .get();
        assert!(ok_count >= 1);
        assert!(err_count >= 1);
    }
}
