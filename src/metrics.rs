//! Metrics collection and export module

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub dispatch_total: IntCounter,
    pub dispatch_success: IntCounter,
    pub dispatch_failed: IntCounter,

    // Histograms
    pub payload_bytes: Histogram,
    pub build_latency: Histogram,
    pub rpc_latency: Histogram,
    pub submit_latency: Histogram,
    pub confirm_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let dispatch_total = IntCounter::with_opts(Opts::new(
            "dispatch_total",
            "Total number of operations dispatched",
        ))?;

        let dispatch_success = IntCounter::with_opts(Opts::new(
            "dispatch_success",
            "Number of operations confirmed without error",
        ))?;

        let dispatch_failed = IntCounter::with_opts(Opts::new(
            "dispatch_failed",
            "Number of operations that failed or landed with an error",
        ))?;

        let payload_bytes = Histogram::with_opts(
            HistogramOpts::new("payload_bytes", "Encoded instruction payload size")
                .buckets(vec![8.0, 16.0, 32.0, 64.0, 128.0, 256.0, 512.0, 1024.0]),
        )?;

        let build_latency = Histogram::with_opts(
            HistogramOpts::new("build_latency_seconds", "Transaction build latency")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01]),
        )?;

        let rpc_latency = Histogram::with_opts(
            HistogramOpts::new("rpc_latency_seconds", "RPC call latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0]),
        )?;

        let submit_latency = Histogram::with_opts(
            HistogramOpts::new("submit_latency_seconds", "Raw transaction submission latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0]),
        )?;

        let confirm_latency = Histogram::with_opts(
            HistogramOpts::new("confirm_latency_seconds", "Time from submission to confirmation")
                .buckets(vec![0.4, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 90.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(dispatch_total.clone()))?;
        registry.register(Box::new(dispatch_success.clone()))?;
        registry.register(Box::new(dispatch_failed.clone()))?;
        registry.register(Box::new(payload_bytes.clone()))?;
        registry.register(Box::new(build_latency.clone()))?;
        registry.register(Box::new(rpc_latency.clone()))?;
        registry.register(Box::new(submit_latency.clone()))?;
        registry.register(Box::new(confirm_latency.clone()))?;

        Ok(Self {
            registry,
            dispatch_total,
            dispatch_success,
            dispatch_failed,
            payload_bytes,
            build_latency,
            rpc_latency,
            submit_latency,
            confirm_latency,
        })
    }

    /// Render the registry in Prometheus text exposition format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
