//! Prometheus metrics for the discovery agent

use anyhow::Result;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Counters describing reconciliation activity
#[derive(Clone)]
pub struct DiscoveryMetrics {
    /// Reconciliation passes by trigger
    pub passes_total: IntCounterVec,
    /// Server records written
    pub servers_published_total: IntCounter,
    /// Failed upserts by record kind (backend, server)
    pub publish_failures_total: IntCounterVec,
    /// Containers that could not be routed, by reason (no_mapping, unpublished, no_service)
    pub skipped_matches_total: IntCounterVec,
    /// Failed watch attempts on the definitions path
    pub watch_failures_total: IntCounter,
    /// Services currently loaded
    pub services: IntGauge,
    /// Prometheus registry for metrics
    pub registry: Arc<Registry>,
}

impl DiscoveryMetrics {
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let passes_total = IntCounterVec::new(
            Opts::new("discovery_passes_total", "Reconciliation passes by trigger"),
            &["trigger"],
        )?;

        let servers_published_total = IntCounter::new(
            "discovery_servers_published_total",
            "Server records written to the registry",
        )?;

        let publish_failures_total = IntCounterVec::new(
            Opts::new(
                "discovery_publish_failures_total",
                "Failed registry upserts by record kind",
            ),
            &["kind"],
        )?;

        let skipped_matches_total = IntCounterVec::new(
            Opts::new(
                "discovery_skipped_matches_total",
                "Containers skipped without a routable port or matching service",
            ),
            &["reason"],
        )?;

        let watch_failures_total = IntCounter::new(
            "discovery_watch_failures_total",
            "Failed watches on the service definitions",
        )?;

        let services = IntGauge::new("discovery_services", "Service definitions currently loaded")?;

        registry.register(Box::new(passes_total.clone()))?;
        registry.register(Box::new(servers_published_total.clone()))?;
        registry.register(Box::new(publish_failures_total.clone()))?;
        registry.register(Box::new(skipped_matches_total.clone()))?;
        registry.register(Box::new(watch_failures_total.clone()))?;
        registry.register(Box::new(services.clone()))?;

        Ok(Self {
            passes_total,
            servers_published_total,
            publish_failures_total,
            skipped_matches_total,
            watch_failures_total,
            services,
            registry,
        })
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
