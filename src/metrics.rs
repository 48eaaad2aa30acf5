//! Metrics collection and export module

use crate::types::ProtocolStep;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metrics for one protocol run
///
/// Each run owns its registry so concurrent runs (and tests) never share
/// counters.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // Counters, labelled by step number
    pub steps_confirmed: IntCounterVec,
    pub steps_failed: IntCounterVec,
    pub verification_mismatches: IntCounter,

    // Histograms
    pub confirmation_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let steps_confirmed = IntCounterVec::new(
            Opts::new("echo_steps_confirmed_total", "Protocol steps confirmed"),
            &["step"],
        )?;

        let steps_failed = IntCounterVec::new(
            Opts::new("echo_steps_failed_total", "Protocol steps that failed"),
            &["step"],
        )?;

        let verification_mismatches = IntCounter::with_opts(Opts::new(
            "echo_verification_mismatches_total",
            "Buffer reads that did not match the written message",
        ))?;

        let confirmation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "echo_confirmation_latency_seconds",
                "Time from submission to the requested commitment level",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(steps_confirmed.clone()))?;
        registry.register(Box::new(steps_failed.clone()))?;
        registry.register(Box::new(verification_mismatches.clone()))?;
        registry.register(Box::new(confirmation_latency.clone()))?;

        Ok(Self {
            registry,
            steps_confirmed,
            steps_failed,
            verification_mismatches,
            confirmation_latency,
        })
    }

    pub fn record_confirmed(&self, step: ProtocolStep, latency: Duration) {
        self.steps_confirmed
            .with_label_values(&[&step.number().to_string()])
            .inc();
        self.confirmation_latency.observe(latency.as_secs_f64());
    }

    pub fn record_failed(&self, step: ProtocolStep) {
        self.steps_failed
            .with_label_values(&[&step.number().to_string()])
            .inc();
    }

    pub fn record_mismatch(&self) {
        self.verification_mismatches.inc();
    }

    /// Render the registry in the Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
