// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder can collect these metrics.
//! One helper per metric family keeps label sets consistent across crates.

use std::sync::OnceLock;

use metrics::{describe_counter, describe_histogram};

static NAMESPACE: OnceLock<String> = OnceLock::new();

/// Set the metric name prefix. Called once by [`crate::install`]; later
/// calls are ignored.
pub(crate) fn set_namespace(namespace: &str) {
    let _ = NAMESPACE.set(namespace.trim().to_string());
}

fn name(base: &str) -> String {
    match NAMESPACE.get() {
        Some(ns) if !ns.is_empty() => format!("{ns}_{base}"),
        _ => base.to_string(),
    }
}

/// Register all metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub(crate) fn register_metrics() {
    describe_counter!(
        name("wa_incoming_messages_total"),
        "Total incoming IM messages processed."
    );
    describe_counter!(
        name("wa_outgoing_messages_total"),
        "Total outgoing IM messages sent."
    );
    describe_counter!(
        name("gemini_requests_total"),
        "Total Gemini API requests by outcome."
    );
    describe_histogram!(
        name("gemini_request_duration_seconds"),
        "Latency distribution for Gemini API calls."
    );
    describe_counter!(
        name("atlantic_requests_total"),
        "Total Atlantic API requests by endpoint and status."
    );
    describe_histogram!(
        name("atlantic_request_duration_seconds"),
        "Latency distribution for Atlantic API requests."
    );
    describe_counter!(name("errors_total"), "Total errors grouped by component.");
}

/// Record an inbound IM message by media kind.
pub fn record_incoming_message(kind: &str) {
    metrics::counter!(name("wa_incoming_messages_total"), "type" => kind.to_string()).increment(1);
}

/// Record an outbound IM message by media kind.
pub fn record_outgoing_message(kind: &str) {
    metrics::counter!(name("wa_outgoing_messages_total"), "type" => kind.to_string()).increment(1);
}

/// Record a Gemini request outcome (`ok`, `quota`, `transient`, `error`)
/// and its latency.
pub fn record_gemini_request(status: &str, seconds: f64) {
    metrics::counter!(name("gemini_requests_total"), "status" => status.to_string()).increment(1);
    metrics::histogram!(name("gemini_request_duration_seconds"), "status" => status.to_string())
        .record(seconds);
}

/// Record an Atlantic request by endpoint and HTTP status label.
pub fn record_atlantic_request(endpoint: &str, status: &str, seconds: f64) {
    metrics::counter!(
        name("atlantic_requests_total"),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        name("atlantic_request_duration_seconds"),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .record(seconds);
}

/// Record an error by originating component.
pub fn record_error(component: &str) {
    metrics::counter!(name("errors_total"), "component" => component.to_string()).increment(1);
}
