//! Runtime settings handed to the reconciliation loop at construction

use std::time::Duration;

/// Discovery agent configuration. Immutable once the agent is running.
#[derive(Clone, Debug)]
pub struct DiscoveryConfig {
    /// Directory holding the service definitions
    pub definitions_path: String,
    /// Base path of the vulcand routing records
    pub routing_path: String,
    /// Externally routable host written into every server URL
    pub advertise_host: String,
    /// Interval between periodic poll passes
    pub poll_interval: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            definitions_path: "/publication".to_string(),
            routing_path: "/vulcand".to_string(),
            advertise_host: "localhost".to_string(),
            poll_interval: Duration::from_secs(30),
        }
    }
}
