use serde::Deserialize;

/// Topology of the cluster under test.
///
/// The harness assumes one deployment topology: a compose project whose
/// consensus members all carry `service_label`, gossip on `consensus_port`
/// and answer status queries on a node-local HTTP endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct ClusterConfig {
    /// Compose service label identifying members of the cluster under test
    #[serde(default = "default_service_label")]
    pub service_label: String,

    /// Well-known consensus port peers advertise in status replies
    #[serde(default = "default_consensus_port")]
    pub consensus_port: u16,

    /// Node-local status endpoint queried via remote exec
    #[serde(default = "default_status_endpoint")]
    pub status_endpoint: String,

    /// Compose network the members share (partition control detaches from it)
    #[serde(default = "default_network")]
    pub network: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            service_label: default_service_label(),
            consensus_port: default_consensus_port(),
            status_endpoint: default_status_endpoint(),
            network: default_network(),
        }
    }
}

fn default_service_label() -> String {
    "com.docker.compose.service=consul".to_string()
}
fn default_consensus_port() -> u16 {
    8300
}
fn default_status_endpoint() -> String {
    "127.0.0.1:8500".to_string()
}
fn default_network() -> String {
    "consul_default".to_string()
}
