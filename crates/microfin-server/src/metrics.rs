// Metrics module for observability
// Provides counters and histograms for authorization decisions and HTTP traffic

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Label used for requests that match no exposed route
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Initialize all metric descriptions
/// Should be called once at application startup
pub fn init_metrics() {
    // Authorization metrics
    describe_counter!(
        "authz_decisions_total",
        "Total number of route authorization decisions by outcome and reason"
    );
    describe_counter!(
        "authz_route_not_configured_total",
        "Total number of requests to routes without an authorization policy"
    );
    describe_counter!(
        "audit_write_failures_total",
        "Total number of audit entries that could not be written"
    );

    // HTTP request metrics
    describe_counter!(
        "http_requests_total",
        "Total number of HTTP requests received"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    tracing::info!("Metrics initialized");
}

/// Install the global Prometheus recorder and return its render handle
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}

/// Record an HTTP request against its route key
pub fn record_http_request(method: &str, route: &str, status: u16, duration_secs: f64) {
    counter!("http_requests_total", "method" => method.to_string(), "route" => route.to_string(), "status" => status.to_string()).increment(1);
    histogram!("http_request_duration_seconds", "method" => method.to_string(), "route" => route.to_string()).record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_recorder_is_noop() {
        init_metrics();
        record_http_request("GET", UNMATCHED_ROUTE, 403, 0.01);
    }
}
