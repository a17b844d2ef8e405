use once_cell::sync::Lazy;
use prometheus::{register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static PROXY_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "account_panel_proxy_requests_total",
        "Requests forwarded to the upstream API, by resulting status",
        &["status"]
    )
    .expect("register proxy_requests_total")
});

pub static PROXY_UPSTREAM_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "account_panel_proxy_upstream_errors_total",
        "Forwarded requests that never got an upstream response"
    )
    .expect("register proxy_upstream_errors_total")
});

pub static PROXY_REQUEST_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "account_panel_proxy_request_duration_seconds",
        "Upstream round trip in seconds",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("register proxy_request_duration")
});

pub static STORE_WRITES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "account_panel_store_writes_total",
        "Successful inventory file replacements"
    )
    .expect("register store_writes_total")
});

pub static STORE_WRITE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "account_panel_store_write_failures_total",
        "Inventory saves that failed"
    )
    .expect("register store_write_failures_total")
});

/// Text exposition of the default registry.
pub fn encode_metrics() -> Result<String, String> {
    Lazy::force(&PROXY_REQUESTS_TOTAL);
    Lazy::force(&PROXY_UPSTREAM_ERRORS_TOTAL);
    Lazy::force(&PROXY_REQUEST_DURATION);
    Lazy::force(&STORE_WRITES_TOTAL);
    Lazy::force(&STORE_WRITE_FAILURES_TOTAL);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("metrics encode error: {e}"))?;
    String::from_utf8(buffer).map_err(|e| format!("metrics encode error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_lists_registered_metrics() {
        STORE_WRITES_TOTAL.inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("account_panel_store_writes_total"));
        assert!(text.contains("account_panel_proxy_upstream_errors_total"));
    }
}
