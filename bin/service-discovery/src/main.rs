use anyhow::{Context, Result};
use clap::Parser;
use discovery_core::{
    ContainerRuntime, CoordinationStore, DiscoveryMetrics, Reconciler, WatchSubscriber,
};
use discovery_docker::DockerClient;
use discovery_etcd::EtcdClient;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod diagnostics;

use config::{Cli, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    info!("Starting service-discovery daemon...");

    let metrics = DiscoveryMetrics::new()?;

    if let Some(addr) = cli.diagnostics_addr {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding diagnostics endpoint on {}", addr))?;
        info!("Diagnostics endpoint listening on {}", addr);
        tokio::task::spawn(diagnostics::serve(listener, metrics.clone()));
    }

    info!(hosts = ?cli.etcd_hosts, "Using etcd");
    let store: Arc<dyn CoordinationStore> =
        Arc::new(EtcdClient::new(&cli.etcd_hosts, cli.request_timeout())?);

    info!(host = %cli.docker_host, "Using docker");
    let runtime: Arc<dyn ContainerRuntime> =
        Arc::new(DockerClient::new(&cli.docker_host, cli.request_timeout())?);

    let config = cli.discovery_config();
    info!(
        servicepath = %config.definitions_path,
        vulcandpath = %config.routing_path,
        hostname = %config.advertise_host,
        "Publishing containers"
    );

    let watch_failures = metrics.watch_failures_total.clone();
    let servicepath = config.definitions_path.clone();
    let changes = WatchSubscriber::new(store.clone(), config.definitions_path.clone())
        .on_error(move |e, retry_in| {
            watch_failures.inc();
            warn!(%servicepath, error = %e, ?retry_in, "etcd watch failed");
        })
        .spawn();

    let reconciler = Reconciler::new(config, store, runtime, metrics);
    if let Err(e) = reconciler.run(changes).await {
        error!("Discovery stopped: {}", e);
        return Err(e.into());
    }

    Ok(())
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}
