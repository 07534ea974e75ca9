//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub probe_attempts: IntCounter,
    pub probe_skipped: IntCounter,
    pub probe_success: IntCounter,
    /// Labelled by error kind
    pub probe_failed: IntCounterVec,
    pub persist_failed: IntCounter,
    pub balance_alerts: IntCounter,

    // Gauges
    pub probe_in_flight: IntGauge,

    // Histograms
    pub broadcast_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let probe_attempts = IntCounter::with_opts(Opts::new(
            "probe_attempts_total",
            "Number of scheduler ticks that started a probe attempt",
        ))?;

        let probe_skipped = IntCounter::with_opts(Opts::new(
            "probe_skipped_total",
            "Attempts skipped because the account nonce had not advanced",
        ))?;

        let probe_success =
            IntCounter::with_opts(Opts::new("probe_success_total", "Probes broadcast successfully"))?;

        let probe_failed = IntCounterVec::new(
            Opts::new("probe_failed_total", "Probes recorded with an error"),
            &["kind"],
        )?;

        let persist_failed = IntCounter::with_opts(Opts::new(
            "persist_failed_total",
            "Probe results that could not be written or uploaded",
        ))?;

        let balance_alerts = IntCounter::with_opts(Opts::new(
            "balance_alerts_total",
            "Low balance alerts raised",
        ))?;

        let probe_in_flight = IntGauge::with_opts(Opts::new(
            "probe_in_flight",
            "Probe attempts currently running",
        ))?;

        let broadcast_latency = Histogram::with_opts(
            HistogramOpts::new("broadcast_latency_seconds", "Latency of the broadcast call")
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0]),
        )?;

        registry.register(Box::new(probe_attempts.clone()))?;
        registry.register(Box::new(probe_skipped.clone()))?;
        registry.register(Box::new(probe_success.clone()))?;
        registry.register(Box::new(probe_failed.clone()))?;
        registry.register(Box::new(persist_failed.clone()))?;
        registry.register(Box::new(balance_alerts.clone()))?;
        registry.register(Box::new(probe_in_flight.clone()))?;
        registry.register(Box::new(broadcast_latency.clone()))?;

        Ok(Self {
            registry,
            probe_attempts,
            probe_skipped,
            probe_success,
            probe_failed,
            persist_failed,
            balance_alerts,
            probe_in_flight,
            broadcast_latency,
        })
    }

    /// Render all metrics in the Prometheus text exposition format
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment() {
        let m = Metrics::new().unwrap();
        m.probe_attempts.inc();
        m.probe_skipped.inc();
        assert_eq!(m.probe_attempts.get(), 1);
        assert_eq!(m.probe_skipped.get(), 1);
    }

    #[test]
    fn test_render_contains_metric_names() {
        let m = Metrics::new().unwrap();
        m.broadcast_latency.observe(0.2);
        let text = m.render().unwrap();
        assert!(text.contains("probe_attempts_total"));
        assert!(text.contains("broadcast_latency_seconds_bucket"));
    }

    #[test]
    fn test_failures_are_labelled_by_kind() {
        let m = Metrics::new().unwrap();
        m.probe_failed.with_label_values(&["broadcast"]).inc();
        m.probe_failed.with_label_values(&["broadcast"]).inc();
        m.probe_failed.with_label_values(&["network_query"]).inc();

        assert_eq!(m.probe_failed.with_label_values(&["broadcast"]).get(), 2);
        assert_eq!(m.probe_failed.with_label_values(&["network_query"]).get(), 1);

        let text = m.render().unwrap();
        assert!(text.contains(r#"probe_failed_total{kind="broadcast"} 2"#));
    }
}
