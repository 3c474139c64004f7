use std::net::SocketAddrV4;
use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::sandbox::RemoteExec;
use crate::topology::ClusterMember;
use crate::Result;

/// One node's self-reported view of the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeStatus {
    /// Consensus endpoint of the current leader, if the node knows one
    pub leader: Option<String>,
    /// Consensus endpoints of the peer set, in reported order
    pub peers: Vec<String>,
}

/// Injectable seam for the convergence checker.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Issue a single status query against one node.
    async fn probe(&self, node: &ClusterMember) -> Result<ProbeStatus>;
}

/// Queries a node's local status endpoint through remote exec and extracts
/// `ip:consensus_port` tokens from the raw reply text.
pub struct StatusProber {
    exec: Arc<dyn RemoteExec>,
    status_endpoint: String,
    consensus_port: u16,
}

impl StatusProber {
    pub fn new(
        exec: Arc<dyn RemoteExec>,
        status_endpoint: impl Into<String>,
        consensus_port: u16,
    ) -> Self {
        Self {
            exec,
            status_endpoint: status_endpoint.into(),
            consensus_port,
        }
    }

    fn curl(&self, path: &str) -> Vec<String> {
        vec![
            "curl".to_string(),
            "-s".to_string(),
            format!("{}{}", self.status_endpoint, path),
        ]
    }
}

#[async_trait]
impl StatusProbe for StatusProber {
    async fn probe(&self, node: &ClusterMember) -> Result<ProbeStatus> {
        let leader_raw = self
            .exec
            .exec(&node.id, &self.curl("/v1/status/leader"))
            .await?;
        let peers_raw = self
            .exec
            .exec(&node.id, &self.curl("/v1/status/peers"))
            .await?;

        // No tokens in a successful reply means "not yet converged",
        // never a fault.
        let status = ProbeStatus {
            leader: extract_consensus_addrs(&leader_raw, self.consensus_port)
                .into_iter()
                .next(),
            peers: extract_consensus_addrs(&peers_raw, self.consensus_port),
        };
        debug!("probe of {}: {:?}", node.name, status);
        Ok(status)
    }
}

/// Extracts every `a.b.c.d:{port}` token from free-form status text.
///
/// Tokens are validated by `SocketAddrV4` parsing, which enforces the
/// dotted-quad shape the status endpoint uses.
pub(crate) fn extract_consensus_addrs(text: &str, port: u16) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_digit() && c != '.' && c != ':')
        .map(|token| token.trim_matches(|c| c == '.' || c == ':'))
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<SocketAddrV4>().ok())
        .filter(|addr| addr.port() == port)
        .map(|addr| addr.to_string())
        .collect()
}
