//! Command line and environment configuration

use clap::{Parser, ValueEnum};
use discovery_core::DiscoveryConfig;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "service-discovery")]
#[command(about = "Publishes running docker containers as vulcand servers through etcd")]
pub struct Cli {
    /// etcd host(s), comma separated or repeated
    #[arg(
        short = 'e',
        long = "etcd-host",
        env = "ETCD_HOSTS",
        value_delimiter = ',',
        default_value = "http://localhost:4001"
    )]
    pub etcd_hosts: Vec<String>,

    /// Base path in etcd for vulcand entries
    #[arg(long = "vulcand-basepath", env = "VULCAND_PATH", default_value = "/vulcand")]
    pub vulcand_basepath: String,

    /// Base path in etcd for service definitions
    #[arg(long = "servicedef-basepath", env = "SERVICEDEF_PATH", default_value = "/publication")]
    pub servicedef_basepath: String,

    /// Docker daemon address
    #[arg(
        short = 'd',
        long = "docker-host",
        env = "DOCKER_HOST",
        default_value = "unix:///var/run/docker.sock"
    )]
    pub docker_host: String,

    /// External hostname registered with vulcand. Must be routable from vulcand.
    #[arg(long, env = "HOST", default_value = "localhost")]
    pub hostname: String,

    /// Seconds between container polls
    #[arg(
        long,
        env = "POLL_INTERVAL",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval: u64,

    /// Timeout in seconds for etcd and docker requests (watches excluded)
    #[arg(
        long,
        env = "REQUEST_TIMEOUT",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout: u64,

    /// Address of the diagnostics endpoint (/healthz, /metrics); disabled when unset
    #[arg(long, env = "DIAGNOSTICS_ADDR")]
    pub diagnostics_addr: Option<SocketAddr>,

    /// so many logs
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            definitions_path: self.servicedef_basepath.clone(),
            routing_path: self.vulcand_basepath.clone(),
            advertise_host: self.hostname.clone(),
            poll_interval: Duration::from_secs(self.poll_interval),
        }
    }
}
