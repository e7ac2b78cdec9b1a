//! Prometheus metrics for the companion backend.
//!
//! Counters cover the notification fan-out path: dispatch calls, per-attempt
//! outcomes, and raw provider calls per channel.

use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec, TextEncoder};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "voltq";

lazy_static! {
    /// Total dispatch calls by target type
    pub static ref DISPATCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_dispatches_total", METRIC_PREFIX),
        "Total notification dispatch calls",
        &["target"]
    ).unwrap();

    /// Total per-attempt outcomes that carried a provider success response
    pub static ref OUTCOMES_DELIVERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_outcomes_delivered_total", METRIC_PREFIX),
        "Total delivery attempts that succeeded"
    ).unwrap();

    /// Total per-attempt outcomes captured as failures
    pub static ref OUTCOMES_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_outcomes_failed_total", METRIC_PREFIX),
        "Total delivery attempts captured as failures"
    ).unwrap();

    /// Wire calls against the Expo gateway (one per chunk)
    pub static ref EXPO_CALLS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_expo_calls_total", METRIC_PREFIX),
        "Total wire calls against the Expo push gateway"
    ).unwrap();

    /// Wire calls against the FCM gateway (one per token)
    pub static ref FCM_CALLS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_fcm_calls_total", METRIC_PREFIX),
        "Total wire calls against the FCM gateway"
    ).unwrap();
}

/// Encode all registered metrics in Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    use prometheus::Encoder;

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        DISPATCHES_TOTAL.with_label_values(&["user"]).inc();
        let output = encode_metrics().unwrap();
        assert!(output.contains("voltq_dispatches_total"));
    }
}
