//! Prometheus metrics registry for the hazard monitor.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and pass it
//! to the ingestion loop, the notification dispatcher and the API.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format
//! (`text/plain; version=0.0.4`).

use prometheus::{Counter, CounterVec, Opts, Registry};

/// Delivery outcome labels for `deliveries_total`.
pub const OUTCOME_DELIVERED: &str = "delivered";
pub const OUTCOME_FAILED: &str = "failed";
pub const OUTCOME_DROPPED: &str = "dropped";

/// All application-level Prometheus metrics.
pub struct AppMetrics {
    /// Readings successfully decoded and ingested.
    pub readings_total: Counter,
    /// Malformed records discarded by the source.
    pub readings_discarded_total: Counter,
    /// Cycles in which the reading source was unavailable.
    pub source_unavailable_total: Counter,
    /// Alerts emitted, labelled by channel and severity.
    pub alerts_emitted_total: CounterVec,
    /// Notification outcomes, labelled `delivered`, `failed` or `dropped`.
    pub deliveries_total: CounterVec,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl AppMetrics {
    /// Create and register all metrics. Returns an error if any metric
    /// name is invalid or duplicated (should not happen in practice).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let readings_total = Counter::with_opts(Opts::new(
            "hazard_monitor_readings_total",
            "Sensor readings ingested",
        ))?;

        let readings_discarded_total = Counter::with_opts(Opts::new(
            "hazard_monitor_readings_discarded_total",
            "Malformed sensor records discarded",
        ))?;

        let source_unavailable_total = Counter::with_opts(Opts::new(
            "hazard_monitor_source_unavailable_total",
            "Ingestion cycles where the reading source was unavailable",
        ))?;

        let alerts_emitted_total = CounterVec::new(
            Opts::new(
                "hazard_monitor_alerts_emitted_total",
                "Alerts emitted by channel and severity",
            ),
            &["channel", "severity"],
        )?;

        let deliveries_total = CounterVec::new(
            Opts::new(
                "hazard_monitor_deliveries_total",
                "Notification deliveries by outcome",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(readings_total.clone()))?;
        registry.register(Box::new(readings_discarded_total.clone()))?;
        registry.register(Box::new(source_unavailable_total.clone()))?;
        registry.register(Box::new(alerts_emitted_total.clone()))?;
        registry.register(Box::new(deliveries_total.clone()))?;

        Ok(Self {
            readings_total,
            readings_discarded_total,
            source_unavailable_total,
            alerts_emitted_total,
            deliveries_total,
            registry,
        })
    }

    pub fn record_delivery(&self, outcome: &str) {
        self.deliveries_total.with_label_values(&[outcome]).inc();
    }

    pub fn delivery_count(&self, outcome: &str) -> f64 {
        self.deliveries_total.with_label_values(&[outcome]).get()
    }

    /// Render all metrics as Prometheus text format (for the `/metrics` endpoint).
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}
