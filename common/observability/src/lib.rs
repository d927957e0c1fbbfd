use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// The only webhook topic that gets its own label value.
pub const HANDLED_WEBHOOK_TOPIC: &str = "orders/create";

/// Prometheus collectors for the payment relay. Cloning shares the underlying counters.
#[derive(Clone)]
pub struct RelayMetrics {
    pub registry: Registry,
    pub gateway_requests_total: IntCounterVec,
    pub gateway_request_duration_seconds: HistogramVec,
    pub order_confirmations_total: IntCounterVec,
    pub platform_updates_total: IntCounterVec,
    pub webhooks_received_total: IntCounterVec,
}

impl RelayMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let gateway_requests_total = IntCounterVec::new(
            Opts::new("satim_gateway_requests_total", "Outbound gateway calls grouped by operation and outcome"),
            &["operation", "outcome"],
        )?;
        let gateway_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "satim_gateway_request_duration_seconds",
                "Latency of outbound gateway calls",
            ).buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0]),
            &["operation"],
        )?;
        let order_confirmations_total = IntCounterVec::new(
            Opts::new("order_confirmations_total", "Confirmation callbacks grouped by resulting order status"),
            &["status"],
        )?;
        let platform_updates_total = IntCounterVec::new(
            Opts::new("platform_order_updates_total", "Paid-status pushes to the e-commerce platform"),
            &["outcome"],
        )?;
        let webhooks_received_total = IntCounterVec::new(
            Opts::new("platform_webhooks_received_total", "Inbound platform webhooks grouped by topic and verdict"),
            &["topic", "result"],
        )?;
        registry.register(Box::new(gateway_requests_total.clone()))?;
        registry.register(Box::new(gateway_request_duration_seconds.clone()))?;
        registry.register(Box::new(order_confirmations_total.clone()))?;
        registry.register(Box::new(platform_updates_total.clone()))?;
        registry.register(Box::new(webhooks_received_total.clone()))?;
        Ok(Self {
            registry,
            gateway_requests_total,
            gateway_request_duration_seconds,
            order_confirmations_total,
            platform_updates_total,
            webhooks_received_total,
        })
    }

    pub fn record_gateway_call(&self, operation: &str, outcome: &str, elapsed_secs: f64) {
        self.gateway_requests_total.with_label_values(&[operation, outcome]).inc();
        self.gateway_request_duration_seconds
            .with_label_values(&[operation])
            .observe(elapsed_secs);
    }

    pub fn record_confirmation(&self, status: &str) {
        self.order_confirmations_total.with_label_values(&[status]).inc();
    }

    pub fn record_platform_update(&self, outcome: &str) {
        self.platform_updates_total.with_label_values(&[outcome]).inc();
    }

    /// Every topic the relay does not act on shares the `other` label value.
    pub fn record_webhook(&self, topic: &str, result: &str) {
        let topic = if topic == HANDLED_WEBHOOK_TOPIC { topic } else { "other" };
        self.webhooks_received_total.with_label_values(&[topic, result]).inc();
    }

    pub fn render(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_render() {
        let metrics = RelayMetrics::new().unwrap();
        metrics.record_gateway_call("register", "ok", 0.2);
        metrics.record_confirmation("paid");
        metrics.record_platform_update("success");
        metrics.record_webhook("orders/create", "accepted");
        let text = metrics.render().unwrap();
        assert!(text.contains("satim_gateway_requests_total{operation=\"register\",outcome=\"ok\"} 1"));
        assert!(text.contains("order_confirmations_total{status=\"paid\"} 1"));
        assert!(text.contains("platform_order_updates_total{outcome=\"success\"} 1"));
    }

    #[test]
    fn unknown_webhook_topics_are_bucketed() {
        let metrics = RelayMetrics::new().unwrap();
        metrics.record_webhook("customers/create", "ignored");
        metrics.record_webhook("app/uninstalled", "ignored");
        metrics.record_webhook("orders/updated", "ignored");
        metrics.record_webhook("orders/paid", "ignored");
        metrics.record_webhook("orders/create", "accepted");
        assert_eq!(metrics.webhooks_received_total.with_label_values(&["other", "ignored"]).get(), 4);
        assert_eq!(metrics.webhooks_received_total.with_label_values(&["orders/create", "accepted"]).get(), 1);
        let text = metrics.render().unwrap();
        assert!(!text.contains("orders/updated"), "{text}");
        assert!(!text.contains("orders/paid"), "{text}");
    }
}
