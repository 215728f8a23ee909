//! Prometheus metrics exposition
//!
//! The rotation core emits through the `metrics` facade:
//!
//! - `keyswitch_attempts_total` (counter): label `outcome`
//! - `keyswitch_rotations_total` (counter)
//! - `keyswitch_exhausted_total` (counter)
//!
//! This binary adds `keyswitch_provider_calls_total` (counter, labels
//! `provider`, `result`) and renders everything with `--print-metrics`.

use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Record the final result of one provider probe.
pub fn record_provider_call(provider: &str, ok: bool) {
    let result = if ok { "ok" } else { "error" };
    metrics::counter!(
        "keyswitch_provider_calls_total",
        "provider" => provider.to_string(),
        "result" => result
    )
    .increment(1);
}
