use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub status_transitions_total: IntCounterVec,
    pub otp_verifications_total: IntCounterVec,
    pub active_deliveries: IntGauge,
    pub partner_utilization: GaugeVec,
    pub route_stops: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let status_transitions_total = IntCounterVec::new(
            Opts::new(
                "status_transitions_total",
                "Delivery status transitions by target status",
            ),
            &["status"],
        )
        .expect("valid status_transitions_total metric");

        let otp_verifications_total = IntCounterVec::new(
            Opts::new("otp_verifications_total", "OTP verifications by outcome"),
            &["outcome"],
        )
        .expect("valid otp_verifications_total metric");

        let active_deliveries = IntGauge::new(
            "active_deliveries",
            "Deliveries currently in a non-terminal state",
        )
        .expect("valid active_deliveries metric");

        let partner_utilization = GaugeVec::new(
            Opts::new("partner_utilization", "Partner utilization ratio [0..1]"),
            &["partner_id"],
        )
        .expect("valid partner_utilization metric");

        let route_stops = Histogram::with_opts(
            HistogramOpts::new("route_stops", "Number of stops per built route")
                .buckets(vec![1.0, 5.0, 10.0, 20.0, 50.0, 100.0]),
        )
        .expect("valid route_stops metric");

        registry
            .register(Box::new(status_transitions_total.clone()))
            .expect("register status_transitions_total");
        registry
            .register(Box::new(otp_verifications_total.clone()))
            .expect("register otp_verifications_total");
        registry
            .register(Box::new(active_deliveries.clone()))
            .expect("register active_deliveries");
        registry
            .register(Box::new(partner_utilization.clone()))
            .expect("register partner_utilization");
        registry
            .register(Box::new(route_stops.clone()))
            .expect("register route_stops");

        Self {
            registry,
            status_transitions_total,
            otp_verifications_total,
            active_deliveries,
            partner_utilization,
            route_stops,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
