//! Prometheus metrics for the cross-domain orchestrator
//!
//! Exposed in text format on the /metrics endpoint for scraping.

#![allow(dead_code)]

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Gauge, HistogramVec,
};

lazy_static! {
    pub static ref SUBMISSIONS: CounterVec = register_counter_vec!(
        "xdomain_submissions_total",
        "Total number of cross-domain message submissions",
        &["chain", "status"]
    )
    .unwrap();

    pub static ref RELAY_POLLS: CounterVec = register_counter_vec!(
        "xdomain_relay_polls_total",
        "Total number of relay-status probes issued",
        &["chain"]
    )
    .unwrap();

    pub static ref RELAYS_OBSERVED: CounterVec = register_counter_vec!(
        "xdomain_relays_observed_total",
        "Total number of messages observed as relayed",
        &["chain"]
    )
    .unwrap();

    pub static ref VERIFICATION_FAILURES: CounterVec = register_counter_vec!(
        "xdomain_verification_failures_total",
        "Total number of post-relay state mismatches",
        &["chain"]
    )
    .unwrap();

    pub static ref CYCLE_LATENCY: HistogramVec = register_histogram_vec!(
        "xdomain_cycle_latency_seconds",
        "Time from submission to verified effect",
        &["direction"],
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .unwrap();

    pub static ref UP: Gauge = register_gauge!(
        "xdomain_up",
        "Whether the orchestrator is up and running"
    )
    .unwrap();
}

/// Record a submission attempt
pub fn record_submission(chain: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    SUBMISSIONS.with_label_values(&[chain, status]).inc();
}

/// Record one relay-status probe
pub fn record_relay_poll(chain: &str) {
    RELAY_POLLS.with_label_values(&[chain]).inc();
}

/// Record a message observed as relayed
pub fn record_relay_observed(chain: &str) {
    RELAYS_OBSERVED.with_label_values(&[chain]).inc();
}

/// Record a post-relay verification mismatch
pub fn record_verification_failure(chain: &str) {
    VERIFICATION_FAILURES.with_label_values(&[chain]).inc();
}

/// Record a completed cycle
pub fn record_cycle(direction: &str, seconds: f64) {
    CYCLE_LATENCY.with_label_values(&[direction]).observe(seconds);
}
