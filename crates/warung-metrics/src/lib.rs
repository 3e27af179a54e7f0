// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for the warung bot.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Metrics are
//! rendered as Prometheus text format via the handle returned by
//! [`install`], which the gateway exposes on `/metrics`.

pub mod recording;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use warung_core::WarungError;

pub use recording::{
    record_atlantic_request, record_error, record_gemini_request, record_incoming_message,
    record_outgoing_message,
};

/// Install the global Prometheus recorder and register metric descriptions.
///
/// Only one recorder can be installed per process; a second call returns an
/// error. `namespace`, when non-empty, prefixes every metric name.
pub fn install(namespace: &str) -> Result<PrometheusHandle, WarungError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| WarungError::Internal(format!("failed to install Prometheus recorder: {e}")))?;

    recording::set_namespace(namespace);
    recording::register_metrics();

    tracing::info!("prometheus metrics recorder installed");

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_a_noop() {
        // The metrics facade silently drops events when no recorder is
        // installed, so helpers must be callable from any context.
        record_incoming_message("text");
        record_outgoing_message("image");
        record_gemini_request("ok", 0.42);
        record_atlantic_request("/transaksi/create", "200", 0.1);
        record_error("atlantic_webhook_auth");
    }
}
