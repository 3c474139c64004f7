//! Cluster topology discovery.
//!
//! Enumerates the sandbox instances belonging to the cluster under test and
//! fixes the canonical node ordering every scenario indexes into. Ordinal 0
//! is the bootstrap node.


use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use crate::sandbox::SandboxControl;
use crate::Result;
use crate::TopologyError;

/// A typed reference to one cluster member, immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMember {
    /// Sandbox instance id, the handle for lifecycle and exec calls
    pub id: String,
    /// Display name, the canonical sort key
    pub name: String,
    /// Network address within the cluster
    pub address: String,
    /// Canonical position after sorting by name; scenario roles index this
    pub ordinal: usize,
}

impl ClusterMember {
    /// The endpoint this member advertises to its peers.
    pub fn consensus_addr(&self, consensus_port: u16) -> String {
        format!("{}:{}", self.address, consensus_port)
    }
}

pub fn is_majority(num: usize, total: usize) -> bool {
    num > total / 2
}

pub fn majority_count(total_nodes: usize) -> usize {
    (total_nodes / 2) + 1
}

/// Discovers the test cluster's members and fixes their canonical ordering.
pub struct ClusterEnumerator {
    sandbox: Arc<dyn SandboxControl>,
    service_label: String,
}

impl ClusterEnumerator {
    pub fn new(sandbox: Arc<dyn SandboxControl>, service_label: impl Into<String>) -> Self {
        Self {
            sandbox,
            service_label: service_label.into(),
        }
    }

    /// Lists instances under the cluster label, sorted by display name
    /// ascending, with ordinals assigned by position.
    ///
    /// The scenario suites are only defined for 3-node and 5-node
    /// topologies; any other count fails before a scenario runs.
    pub async fn discover(&self) -> Result<Vec<ClusterMember>> {
        let mut instances = self.sandbox.list(&self.service_label).await?;
        if instances.is_empty() {
            return Err(TopologyError::NoMembers(self.service_label.clone()).into());
        }

        instances.sort_by(|a, b| a.name.cmp(&b.name));

        let mut seen = HashSet::new();
        let members: Vec<ClusterMember> = instances
            .into_iter()
            .enumerate()
            .map(|(ordinal, instance)| ClusterMember {
                id: instance.id,
                name: instance.name,
                address: instance.address,
                ordinal,
            })
            .collect();

        for member in &members {
            if !seen.insert(member.address.clone()) {
                return Err(TopologyError::DuplicateAddress(member.address.clone()).into());
            }
        }

        if members.len() != 3 && members.len() != 5 {
            return Err(TopologyError::UnsupportedClusterSize(members.len()).into());
        }

        info!(
            "discovered {}-node cluster, bootstrap node is {}",
            members.len(),
            members[0].name
        );
        Ok(members)
    }
}
