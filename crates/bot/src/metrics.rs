//! Prometheus metrics for the bot.
//!
//! Core metrics (jobs, sessions, disposals) are registered alongside the
//! console's own command and delivery counters.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::warn;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Console commands handled, by command.
pub static COMMANDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("comicrelay_commands_total", "Total console commands handled"),
        &["command"],
    )
    .unwrap()
});

/// Artifact deliveries, by result.
pub static DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("comicrelay_deliveries_total", "Total artifact deliveries"),
        &["result"], // "delivered", "failed"
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    let bot: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(COMMANDS_TOTAL.clone()),
        Box::new(DELIVERIES_TOTAL.clone()),
    ];

    for collector in comicrelay_core::metrics::all_metrics().into_iter().chain(bot) {
        if let Err(e) = registry.register(collector) {
            warn!("Failed to register metric: {}", e);
        }
    }
}

/// Encode all registered metrics in the text exposition format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_core_and_bot_metrics() {
        COMMANDS_TOTAL.with_label_values(&["status"]).inc();
        comicrelay_core::metrics::FETCH_JOBS
            .with_label_values(&["completed"])
            .inc();

        let text = encode_metrics();
        assert!(text.contains("comicrelay_commands_total"));
        assert!(text.contains("comicrelay_fetch_jobs_total"));
    }
}
