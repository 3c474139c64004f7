//! Harness Error Hierarchy
//!
//! Defines error types for the cluster conformance harness, categorized by
//! the phase of a run they can fail: probing, convergence checking, topology
//! discovery, node lifecycle control, partition control and write assertions.

use ::config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Status-query failures against a single node
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// Convergence check exhausted its retry budget
    #[error(transparent)]
    Convergence(#[from] ConvergenceError),

    /// Cluster discovery / topology validation failures
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// Node stop/start collaborator failures
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Partition collaborator failures
    #[error(transparent)]
    Partition(#[from] PartitionError),

    /// Write-path assertion failures
    #[error(transparent)]
    Write(#[from] WriteError),

    /// Harness configuration failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unrecoverable failures requiring run termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Errors from a single status query. Transient errors are the only errors
/// the harness ever retries without penalty.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The node is mid-restart / not yet serving its status endpoint
    #[error("node not yet serving: {0}")]
    Transient(String),

    /// Malformed response or refused connection from a node that should be up
    #[error("status query failed: {0}")]
    Hard(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConvergenceError {
    /// Retry budget exhausted without matching the expected state.
    /// Carries the last observed state for diff-ability.
    #[error(
        "cluster did not converge after {attempts} attempts (expected {expected:?}, last observed leader {observed_leader:?}, peers {observed_peers:?})"
    )]
    Timeout {
        attempts: usize,
        expected: Vec<String>,
        observed_leader: Option<String>,
        observed_peers: Vec<String>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// The scenario suites are only defined for 3-node and 5-node clusters
    #[error("unsupported cluster size {0}: need exactly 3 or 5 nodes")]
    UnsupportedClusterSize(usize),

    /// Member addresses must be unique for the lifetime of a run
    #[error("duplicate member address {0}")]
    DuplicateAddress(String),

    /// Discovery matched nothing under the cluster label
    #[error("no cluster members matched label {0}")]
    NoMembers(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("failed to stop {name}: {reason}")]
    StopFailed { name: String, reason: String },

    #[error("failed to start {name}: {reason}")]
    StartFailed { name: String, reason: String },

    /// Start poll budget expired before the node reported a running status
    #[error("{name} did not report running within {attempts} attempts")]
    StartTimeout { name: String, attempts: usize },

    #[error("failed to inspect {name}: {reason}")]
    InspectFailed { name: String, reason: String },

    /// Scenario interrupted between steps; stopped nodes stay stopped
    #[error("run cancelled before step {step}")]
    Cancelled { step: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    #[error("failed to isolate partition groups: {0}")]
    IsolateFailed(String),

    #[error("failed to heal partition: {0}")]
    HealFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The write path behaved opposite to the declared quorum expectation
    #[error("{consistency} write expected to {expectation} but {outcome}")]
    AssertionFailed {
        consistency: &'static str,
        expectation: &'static str,
        outcome: &'static str,
    },

    #[error("write request failed: {0}")]
    RequestFailed(String),
}

impl Error {
    /// Transient probe errors are retried without consuming retry budget;
    /// everything else is decisive.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Probe(ProbeError::Transient(_)))
    }
}
