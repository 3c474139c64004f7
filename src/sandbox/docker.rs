use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use tracing::warn;

use super::PartitionControl;
use super::RemoteExec;
use super::RunState;
use super::SandboxControl;
use super::SandboxInstance;
use crate::topology::ClusterMember;
use crate::Error;
use crate::LifecycleError;
use crate::PartitionError;
use crate::ProbeError;
use crate::Result;

/// Adapter from the collaborator traits to the local `docker` CLI.
///
/// One instance covers all three collaborator roles: process control,
/// remote exec and (via compose-network attach/detach) partition control.
pub struct DockerSandbox {
    network: String,
}

impl DockerSandbox {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
        }
    }

    async fn docker(args: &[String]) -> std::result::Result<String, String> {
        let output = Command::new("docker")
            .args(args)
            .output()
            .await
            .map_err(|e| format!("failed to spawn docker: {e}"))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(format!(
                "docker {} exited with {}: {}",
                args.first().map(String::as_str).unwrap_or(""),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }

    async fn instance_address(id: &str) -> std::result::Result<String, String> {
        let out = Self::docker(&args([
            "inspect",
            "-f",
            "{{range .NetworkSettings.Networks}}{{.IPAddress}} {{end}}",
            id,
        ]))
        .await?;
        out.split_whitespace()
            .next()
            .map(str::to_string)
            .ok_or_else(|| format!("no network address reported for {id}"))
    }
}

fn args<const N: usize>(argv: [&str; N]) -> Vec<String> {
    argv.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn parse_run_state(raw: &str) -> RunState {
    match raw.trim() {
        "running" => RunState::Running,
        "restarting" => RunState::Restarting,
        "exited" => RunState::Exited,
        other => RunState::Unknown(other.to_string()),
    }
}

/// The docker daemon reports exec attempts against a stopping or restarting
/// container with these phrases; they are the harness's transient class.
pub(crate) fn is_transient_exec_failure(reason: &str) -> bool {
    reason.contains("is restarting") || reason.contains("is not running")
}

#[async_trait]
impl SandboxControl for DockerSandbox {
    async fn list(&self, label: &str) -> Result<Vec<SandboxInstance>> {
        let out = Self::docker(&args([
            "ps",
            "--filter",
            &format!("label={label}"),
            "--format",
            "{{.ID}}\t{{.Names}}",
        ]))
        .await
        .map_err(Error::Fatal)?;

        let mut instances = Vec::new();
        for line in out.lines() {
            let mut fields = line.split('\t');
            let (Some(id), Some(name)) = (fields.next(), fields.next()) else {
                continue;
            };
            let address = Self::instance_address(id).await.map_err(Error::Fatal)?;
            instances.push(SandboxInstance {
                id: id.to_string(),
                name: name.to_string(),
                address,
            });
        }
        Ok(instances)
    }

    async fn stop(&self, id: &str) -> Result<()> {
        Self::docker(&args(["stop", id]))
            .await
            .map_err(|reason| LifecycleError::StopFailed {
                name: id.to_string(),
                reason,
            })?;
        // Block until the process has fully exited.
        Self::docker(&args(["wait", id]))
            .await
            .map_err(|reason| LifecycleError::StopFailed {
                name: id.to_string(),
                reason,
            })?;
        debug!("stopped {}", id);
        Ok(())
    }

    async fn start(&self, id: &str) -> Result<()> {
        Self::docker(&args(["start", id]))
            .await
            .map_err(|reason| LifecycleError::StartFailed {
                name: id.to_string(),
                reason,
            })?;
        Ok(())
    }

    async fn inspect_state(&self, id: &str) -> Result<RunState> {
        let out = Self::docker(&args(["inspect", "-f", "{{.State.Status}}", id]))
            .await
            .map_err(|reason| LifecycleError::InspectFailed {
                name: id.to_string(),
                reason,
            })?;
        Ok(parse_run_state(&out))
    }
}

#[async_trait]
impl RemoteExec for DockerSandbox {
    async fn exec(&self, id: &str, argv: &[String]) -> Result<String> {
        let mut full = args(["exec", id]);
        full.extend_from_slice(argv);

        match Self::docker(&full).await {
            Ok(out) => Ok(out),
            Err(reason) if is_transient_exec_failure(&reason) => {
                debug!("exec on {} deferred: {}", id, reason);
                Err(ProbeError::Transient(reason).into())
            }
            Err(reason) => Err(ProbeError::Hard(reason).into()),
        }
    }
}

#[async_trait]
impl PartitionControl for DockerSandbox {
    async fn isolate(&self, group_a: &[ClusterMember], group_b: &[ClusterMember]) -> Result<()> {
        debug!(
            "isolating {:?} from {:?}",
            group_a.iter().map(|m| &m.name).collect::<Vec<_>>(),
            group_b.iter().map(|m| &m.name).collect::<Vec<_>>()
        );
        for member in group_a {
            Self::docker(&args(["network", "disconnect", &self.network, &member.id]))
                .await
                .map_err(PartitionError::IsolateFailed)?;
        }
        Ok(())
    }

    async fn heal(&self, members: &[ClusterMember]) -> Result<()> {
        for member in members {
            if let Err(reason) =
                Self::docker(&args(["network", "connect", &self.network, &member.id])).await
            {
                // Members that never left the network are already attached.
                if reason.contains("already exists") {
                    warn!("{} already attached to {}", member.name, self.network);
                    continue;
                }
                return Err(PartitionError::HealFailed(reason).into());
            }
        }
        Ok(())
    }
}
