use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::debug;
use tracing::info;

use crate::sandbox::RemoteExec;
use crate::topology::ClusterMember;
use crate::Result;
use crate::WriteError;

/// Consistency level a write assertion is issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consistency {
    /// Served by any node, quorum not required
    Stale,
    /// Served only through an elected leader holding quorum
    Consistent,
}

impl Consistency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::Stale => "stale",
            Consistency::Consistent => "consistent",
        }
    }
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write-path assertion collaborator.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WriteProbe: Send + Sync {
    /// Write through the first member and read back from every member under
    /// `consistency`; the observed outcome must match `expect_success`.
    async fn assert_write(
        &self,
        members: &[ClusterMember],
        consistency: Consistency,
        expect_success: bool,
    ) -> Result<()>;
}

/// Exercises the node-local KV API through remote exec.
///
/// A transport failure against a member counts as an unsuccessful write,
/// not a harness fault: scenarios assert against members that may have lost
/// quorum on purpose.
pub struct KvWriteProbe {
    exec: Arc<dyn RemoteExec>,
    status_endpoint: String,
}

impl KvWriteProbe {
    pub fn new(exec: Arc<dyn RemoteExec>, status_endpoint: impl Into<String>) -> Self {
        Self {
            exec,
            status_endpoint: status_endpoint.into(),
        }
    }

    fn probe_key() -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        format!("quorum-harness/probe-{nanos}")
    }

    async fn try_round_trip(
        &self,
        members: &[ClusterMember],
        consistency: Consistency,
        key: &str,
    ) -> bool {
        let put = vec![
            "curl".to_string(),
            "-s".to_string(),
            "-X".to_string(),
            "PUT".to_string(),
            "-d".to_string(),
            key.to_string(),
            format!("{}/v1/kv/{}", self.status_endpoint, key),
        ];
        match self.exec.exec(&members[0].id, &put).await {
            Ok(body) if body.trim() == "true" => {}
            Ok(body) => {
                debug!("write rejected: {}", body.trim());
                return false;
            }
            Err(e) => {
                debug!("write request failed: {e}");
                return false;
            }
        }

        for member in members {
            let get = vec![
                "curl".to_string(),
                "-s".to_string(),
                format!(
                    "{}/v1/kv/{}?raw&{}",
                    self.status_endpoint,
                    key,
                    consistency.as_str()
                ),
            ];
            match self.exec.exec(&member.id, &get).await {
                Ok(body) if body.trim() == key => {}
                Ok(body) => {
                    debug!("{} read on {} returned {:?}", consistency, member.name, body.trim());
                    return false;
                }
                Err(e) => {
                    debug!("{} read on {} failed: {e}", consistency, member.name);
                    return false;
                }
            }
        }
        true
    }
}

#[async_trait]
impl WriteProbe for KvWriteProbe {
    async fn assert_write(
        &self,
        members: &[ClusterMember],
        consistency: Consistency,
        expect_success: bool,
    ) -> Result<()> {
        if members.is_empty() {
            return Err(WriteError::RequestFailed("no members to write against".to_string()).into());
        }

        let key = Self::probe_key();
        let succeeded = self.try_round_trip(members, consistency, &key).await;
        info!(
            "{} write against {} members: expected {}, observed {}",
            consistency,
            members.len(),
            if expect_success { "success" } else { "failure" },
            if succeeded { "success" } else { "failure" },
        );

        if succeeded == expect_success {
            Ok(())
        } else {
            Err(WriteError::AssertionFailed {
                consistency: consistency.as_str(),
                expectation: if expect_success { "succeed" } else { "fail" },
                outcome: if succeeded { "succeeded" } else { "failed" },
            }
            .into())
        }
    }
}
