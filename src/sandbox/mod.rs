//! Collaborator seams for the process sandbox hosting the cluster under test.
//!
//! The harness never touches containers directly; everything goes through
//! these traits so scenarios and convergence checks can run against test
//! doubles. `DockerSandbox` is the production adapter.

mod docker;
pub use docker::*;


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::topology::ClusterMember;
use crate::Result;

/// One discovered sandbox instance, before ordinals are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxInstance {
    pub id: String,
    pub name: String,
    pub address: String,
}

/// Self-reported running state of a sandboxed process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Running,
    Restarting,
    Exited,
    Unknown(String),
}

/// Process-sandbox control surface.
///
/// `stop` is synchronous from the caller's point of view: it must not return
/// until the process has fully exited. `start` only issues the start; callers
/// poll `inspect_state` until the process reports [`RunState::Running`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SandboxControl: Send + Sync {
    async fn list(&self, label: &str) -> Result<Vec<SandboxInstance>>;

    async fn stop(&self, id: &str) -> Result<()>;

    async fn start(&self, id: &str) -> Result<()>;

    async fn inspect_state(&self, id: &str) -> Result<RunState>;
}

/// Remote command execution inside one sandboxed process.
///
/// Implementations classify "process is mid-restart" failures as
/// [`crate::ProbeError::Transient`]; callers retry those without penalty.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteExec: Send + Sync {
    /// Run `argv` inside the instance and return its collected output text.
    async fn exec(&self, id: &str, argv: &[String]) -> Result<String>;
}

/// Network partition control. Opaque to the core: the harness only needs a
/// before/after barrier around `isolate` and `heal`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PartitionControl: Send + Sync {
    /// Cut reachability between the two groups.
    async fn isolate(&self, group_a: &[ClusterMember], group_b: &[ClusterMember]) -> Result<()>;

    /// Restore full reachability between all members.
    async fn heal(&self, members: &[ClusterMember]) -> Result<()>;
}
