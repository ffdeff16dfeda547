//! Reconciliation of service definitions against running containers

use crate::config::DiscoveryConfig;
use crate::definitions::DefinitionStore;
use crate::metrics::DiscoveryMetrics;
use crate::ports::{resolve_port, NotExposed};
use crate::publisher::RegistryPublisher;
use crate::runtime::ContainerRuntime;
use crate::service::{instance_name, Service};
use crate::store::CoordinationStore;
use crate::watch::ChangeFeed;
use crate::Result;
use discovery_api::ContainerInstance;
use std::sync::Arc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// What started a reconciliation pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Initial,
    Tick,
    Definitions,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Initial => "initial",
            Trigger::Tick => "tick",
            Trigger::Definitions => "definitions",
        }
    }
}

/// Outcome of one poll pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Containers reported by the runtime
    pub containers: usize,
    /// (service, container name) pairs that matched
    pub matched: usize,
    /// Servers written
    pub published: usize,
    /// Matches without a routable port
    pub skipped: usize,
    /// Containers matching no service
    pub unmatched: usize,
    /// Server writes that failed
    pub failed: usize,
}

/// Owns the current service set and drives every registry write.
///
/// Passes run strictly one after another: a trigger is handled to
/// completion before the next one is looked at.
pub struct Reconciler {
    config: DiscoveryConfig,
    runtime: Arc<dyn ContainerRuntime>,
    definitions: DefinitionStore,
    publisher: RegistryPublisher,
    metrics: DiscoveryMetrics,
    services: Vec<Service>,
}

impl Reconciler {
    pub fn new(
        config: DiscoveryConfig,
        store: Arc<dyn CoordinationStore>,
        runtime: Arc<dyn ContainerRuntime>,
        metrics: DiscoveryMetrics,
    ) -> Self {
        let definitions = DefinitionStore::new(store.clone(), config.definitions_path.clone());
        let publisher = RegistryPublisher::new(store, &config.routing_path);
        Self {
            config,
            runtime,
            definitions,
            publisher,
            metrics,
            services: Vec::new(),
        }
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Replace the service set from the store and republish every backend
    pub async fn reload(&mut self) -> Result<()> {
        self.services = self.definitions.load_all().await?;
        self.metrics.services.set(self.services.len() as i64);
        info!(count = self.services.len(), "loaded service definitions");
        self.publish_backends().await;
        Ok(())
    }

    /// Upsert the backend of every service. Returns the number of failures.
    pub async fn publish_backends(&self) -> usize {
        let mut failures = 0;
        for service in &self.services {
            if let Err(e) = self.publisher.publish_backend(service).await {
                warn!(service = %service.key(), error = %e, "could not register backend");
                self.metrics
                    .publish_failures_total
                    .with_label_values(&["backend"])
                    .inc();
                failures += 1;
            }
        }
        failures
    }

    /// Match running containers against the service set and publish a
    /// server for every routable match.
    ///
    /// Only a failure to list containers is returned as an error.
    pub async fn poll_pass(&self, trigger: Trigger) -> Result<PassSummary> {
        let containers = self.runtime.list_containers().await?;
        self.metrics
            .passes_total
            .with_label_values(&[trigger.as_str()])
            .inc();

        let mut summary = PassSummary {
            containers: containers.len(),
            ..Default::default()
        };

        for container in &containers {
            let mut container_matched = false;
            for raw_name in &container.names {
                let name = instance_name(raw_name);
                for service in self.services.iter().filter(|s| s.matches(name)) {
                    container_matched = true;
                    summary.matched += 1;
                    debug!(service = %service.key(), container_name = %name, "registering container as server");
                    self.register(service, container, name, &mut summary).await;
                }
            }
            if !container_matched {
                warn!(container = %container.id, names = ?container.names, "container matches no service");
                self.metrics
                    .skipped_matches_total
                    .with_label_values(&["no_service"])
                    .inc();
                summary.unmatched += 1;
            }
        }

        debug!(
            trigger = trigger.as_str(),
            containers = summary.containers,
            matched = summary.matched,
            published = summary.published,
            skipped = summary.skipped,
            unmatched = summary.unmatched,
            failed = summary.failed,
            "poll pass complete"
        );
        Ok(summary)
    }

    async fn register(
        &self,
        service: &Service,
        container: &ContainerInstance,
        name: &str,
        summary: &mut PassSummary,
    ) {
        let port = match resolve_port(container, service.container_port()) {
            Ok(port) => port,
            Err(reason) => {
                warn!(
                    service = %service.key(),
                    container = %container.id,
                    container_name = %name,
                    container_port = service.container_port(),
                    error = %reason,
                    "could not find exposed port"
                );
                let label = match reason {
                    NotExposed::NoMapping => "no_mapping",
                    NotExposed::Unpublished(_) => "unpublished",
                };
                self.metrics
                    .skipped_matches_total
                    .with_label_values(&[label])
                    .inc();
                summary.skipped += 1;
                return;
            }
        };

        match self
            .publisher
            .publish_server(service, name, &self.config.advertise_host, port)
            .await
        {
            Ok(()) => {
                self.metrics.servers_published_total.inc();
                summary.published += 1;
            }
            Err(e) => {
                warn!(
                    service = %service.key(),
                    container = %container.id,
                    container_name = %name,
                    error = %e,
                    "could not add container to server registry"
                );
                self.metrics
                    .publish_failures_total
                    .with_label_values(&["server"])
                    .inc();
                summary.failed += 1;
            }
        }
    }

    /// Run until a fatal error: the store cannot be read, the runtime
    /// cannot be listed, or the definitions watch has given up.
    pub async fn run(mut self, mut changes: ChangeFeed) -> Result<()> {
        self.definitions.ensure_base().await;

        info!("setting up backends");
        self.reload().await?;
        info!("initial pass");
        self.poll_pass(Trigger::Initial).await?;

        let period = self.config.poll_interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // NOTE: backends and servers are never deleted; orphans must be removed by hand
        info!(interval = ?period, "beginning watch");
        loop {
            tokio::select! {
                changed = changes.changed() => {
                    changed?;
                    info!("detected change to service definitions");
                    self.reload().await?;
                    self.poll_pass(Trigger::Definitions).await?;
                }
                _ = ticker.tick() => {
                    debug!("tick");
                    self.poll_pass(Trigger::Tick).await?;
                }
            }
        }
    }
}
