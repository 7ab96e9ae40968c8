use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

// ============================================================================
// Metrics Module - Prometheus metrics for the order pipeline
// ============================================================================
//
// Covers:
// - Order processing per stream (throughput, latency, failures)
// - Retry re-publication per attempt
// - Dead-letter routing and receipt
// - Broker publish failures and circuit breaker state
//
// Scraped via GET /metrics on the management API.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Processing
    pub orders_processed: IntCounterVec,
    pub orders_failed: IntCounterVec,
    pub processing_duration: HistogramVec,
    pub undecodable_messages: IntCounterVec,

    // Escalation
    pub retry_published: IntCounterVec,
    pub dlq_routed: IntCounterVec,
    pub dlq_received: IntCounter,
    pub publish_failures: IntCounterVec,

    // Broker
    pub circuit_breaker_state: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_processed = IntCounterVec::new(
            Opts::new("orders_processed_total", "Orders validated and aggregated"),
            &["stream"],
        )?;
        registry.register(Box::new(orders_processed.clone()))?;

        let orders_failed = IntCounterVec::new(
            Opts::new("orders_failed_total", "Orders that failed processing and were escalated"),
            &["stream", "reason"],
        )?;
        registry.register(Box::new(orders_failed.clone()))?;

        let processing_duration = HistogramVec::new(
            HistogramOpts::new("order_processing_duration_seconds", "Order processing duration")
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["stream"],
        )?;
        registry.register(Box::new(processing_duration.clone()))?;

        let undecodable_messages = IntCounterVec::new(
            Opts::new("undecodable_messages_total", "Messages whose payload could not be decoded"),
            &["stream"],
        )?;
        registry.register(Box::new(undecodable_messages.clone()))?;

        let retry_published = IntCounterVec::new(
            Opts::new("retry_published_total", "Orders re-published to the retry stream"),
            &["attempt"],
        )?;
        registry.register(Box::new(retry_published.clone()))?;

        let dlq_routed = IntCounterVec::new(
            Opts::new("dlq_routed_total", "Orders routed to the dead letter stream"),
            &["reason"],
        )?;
        registry.register(Box::new(dlq_routed.clone()))?;

        let dlq_received = IntCounter::new(
            "dlq_received_total",
            "Dead letter messages consumed into the archive",
        )?;
        registry.register(Box::new(dlq_received.clone()))?;

        let publish_failures = IntCounterVec::new(
            Opts::new("publish_failures_total", "Failed publishes by destination topic"),
            &["topic"],
        )?;
        registry.register(Box::new(publish_failures.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Producer circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            orders_processed,
            orders_failed,
            processing_duration,
            undecodable_messages,
            retry_published,
            dlq_routed,
            dlq_received,
            publish_failures,
            circuit_breaker_state,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn render(&self) -> anyhow::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }

    pub fn record_processed(&self, stream: &str, duration_secs: f64) {
        self.orders_processed.with_label_values(&[stream]).inc();
        self.processing_duration.with_label_values(&[stream]).observe(duration_secs);
    }

    pub fn record_failed(&self, stream: &str, reason: &str, duration_secs: f64) {
        self.orders_failed.with_label_values(&[stream, reason]).inc();
        self.processing_duration.with_label_values(&[stream]).observe(duration_secs);
    }

    pub fn record_undecodable(&self, stream: &str) {
        self.undecodable_messages.with_label_values(&[stream]).inc();
    }

    pub fn record_retry_published(&self, attempt: u32) {
        self.retry_published.with_label_values(&[&attempt.to_string()]).inc();
    }

    pub fn record_dlq_routed(&self, reason: &str) {
        self.dlq_routed.with_label_values(&[reason]).inc();
    }

    pub fn record_dlq_received(&self) {
        self.dlq_received.inc();
    }

    pub fn record_publish_failure(&self, topic: &str) {
        self.publish_failures.with_label_values(&[topic]).inc();
    }

    pub fn update_circuit_breaker_state(&self, state: i64) {
        self.circuit_breaker_state.set(state);
    }
}
