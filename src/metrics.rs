// ===============================
// src/metrics.rs
// ===============================
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use tracing::warn;

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Service fan-out --------
pub static PUBLISHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("publishes_total", "publish calls per keyed service"),
        &["service"],
    )
    .unwrap()
});

// -------- Connectors --------
pub static RECORDS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("connector_records_total", "boundary records (labels: feed, outcome)"),
        &["feed", "outcome"],
    )
    .unwrap()
});

// -------- Algo execution / execution --------
pub static ALGO_ORDERS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("algo_orders_total", "algo execution orders by pricing side"),
        &["side"],
    )
    .unwrap()
});

pub static FILLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fills_total", "fills by destination book"),
        &["book"],
    )
    .unwrap()
});

// -------- Streaming / inquiries --------
pub static STREAMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("price_streams_total", "two-way streams per product"),
        &["product"],
    )
    .unwrap()
});

pub static INQUIRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("inquiries_total", "inquiry dispositions by state"),
        &["state"],
    )
    .unwrap()
});

// -------- Inventory --------
pub static AGG_POSITION: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("aggregate_position", "net position across books"),
        &["product"],
    )
    .unwrap()
});

/// Register every metric. Returns how many registrations failed; each one is logged.
pub fn init() -> usize {
    let mut failed = 0;
    // Register all metrics to the custom registry
    for m in [
        REGISTRY.register(Box::new(PUBLISHES.clone())),
        REGISTRY.register(Box::new(RECORDS.clone())),
        REGISTRY.register(Box::new(ALGO_ORDERS.clone())),
        REGISTRY.register(Box::new(FILLS.clone())),
        REGISTRY.register(Box::new(STREAMS.clone())),
        REGISTRY.register(Box::new(INQUIRIES.clone())),
        REGISTRY.register(Box::new(AGG_POSITION.clone())),
    ] {
        if let Err(e) = m {
            warn!(error = %e, "metric registration failed");
            failed += 1;
        }
    }
    failed
}

// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    if encoder.encode(&families, &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_counters_show_up_in_the_text_snapshot() {
        init();
        FILLS.with_label_values(&["TRSY9"]).inc();
        let text = String::from_utf8(encode_metrics()).unwrap();
        assert!(text.contains("fills_total{book=\"TRSY9\"}"));
    }

    #[test]
    fn second_init_reports_every_collector_as_already_registered() {
        init();
        assert_eq!(init(), 7);
    }
}
