//! Metrics collection and Prometheus export.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::models::OtpPurpose;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Call once at startup; later calls are no-ops.
pub fn init_metrics() -> Result<(), anyhow::Error> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_sign_up() {
    counter!("auth_sign_ups_total").increment(1);
}

pub fn record_sign_in(outcome: &'static str) {
    counter!("auth_sign_ins_total", "outcome" => outcome).increment(1);
}

pub fn record_otp_sent(purpose: OtpPurpose) {
    counter!("auth_otp_sent_total", "purpose" => purpose.as_str()).increment(1);
}

pub fn record_otp_verification(accepted: bool) {
    let outcome = if accepted { "accepted" } else { "rejected" };
    counter!("auth_otp_verifications_total", "outcome" => outcome).increment(1);
}

pub fn record_token_rejection(kind: &'static str) {
    counter!("auth_token_rejections_total", "kind" => kind).increment(1);
}
