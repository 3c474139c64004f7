//! Convergence detection.
//!
//! The retry state machine that decides whether the cluster has
//! re-stabilized around an expected membership: repeatedly probes one
//! reference node until its self-reported state matches the expected set
//! under the requested mode, or a finite retry budget runs out.


use std::sync::Arc;

use tokio::time::sleep;
use tokio::time::timeout;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::BackoffPolicy;
use crate::probe::ProbeStatus;
use crate::probe::StatusProbe;
use crate::topology::ClusterMember;
use crate::ConvergenceError;
use crate::Error;
use crate::Result;

/// How observed state is compared against the expected membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceMode {
    /// The reported leader must be a member of the expected set
    Election,
    /// The sorted reported peer list must be list-equal to the sorted
    /// expected set: same length, same elements
    StrictMembership,
}

/// Transient probe errors are exempt from the retry budget; the loop still
/// needs a hard cap on total iterations so an eternally-restarting
/// reference node cannot stall a run forever.
const TRANSIENT_SLACK_FACTOR: usize = 10;

/// Polls a reference node until it reports the expected cluster state.
///
/// Purely observational: never mutates cluster state. Bounded retries turn
/// the cluster's liveness property into a decidable pass/fail verdict.
pub struct ConvergenceChecker {
    prober: Arc<dyn StatusProbe>,
    policy: BackoffPolicy,
    consensus_port: u16,
}

impl ConvergenceChecker {
    pub fn new(prober: Arc<dyn StatusProbe>, policy: BackoffPolicy, consensus_port: u16) -> Self {
        Self {
            prober,
            policy,
            consensus_port,
        }
    }

    /// Waits until `reference` reports a state matching `expected_members`
    /// under `mode`.
    ///
    /// Each iteration sleeps the poll interval, then probes with a per-call
    /// timeout. Transient errors retry without consuming an attempt; a
    /// hung or timed-out call consumes one; hard errors abort immediately.
    pub async fn await_convergence(
        &self,
        reference: &ClusterMember,
        expected_members: &[ClusterMember],
        mode: ConvergenceMode,
    ) -> Result<()> {
        let mut expected: Vec<String> = expected_members
            .iter()
            .map(|m| m.consensus_addr(self.consensus_port))
            .collect();
        expected.sort();
        info!("expected peers: {}", expected.join(","));

        let max_iterations = self
            .policy
            .max_retries
            .saturating_mul(TRANSIENT_SLACK_FACTOR)
            .max(self.policy.max_retries);
        let mut attempts = 0usize;
        let mut iterations = 0usize;
        let mut last_observed = ProbeStatus::default();

        loop {
            sleep(self.policy.poll_interval()).await;
            iterations += 1;

            match timeout(self.policy.op_timeout(), self.prober.probe(reference)).await {
                Err(_) => {
                    // A hung remote call must still let the budget expire.
                    warn!(
                        "probe of {} timed out after {:?}",
                        reference.name,
                        self.policy.op_timeout()
                    );
                    attempts += 1;
                    last_observed = ProbeStatus::default();
                }
                Ok(Err(ref e)) if e.is_transient() => {
                    debug!("reference node mid-restart, retrying without penalty: {e}");
                }
                Ok(Err(e)) => return Err(e),
                Ok(Ok(observed)) => {
                    if matches(&observed, &expected, mode) {
                        info!(
                            "converged on {:?} after {} attempts (leader {:?})",
                            mode,
                            attempts + 1,
                            observed.leader
                        );
                        return Ok(());
                    }
                    attempts += 1;
                    last_observed = observed;
                }
            }

            if attempts >= self.policy.max_retries || iterations >= max_iterations {
                warn!(
                    "convergence budget exhausted: expected {:?}, last observed {:?}",
                    expected, last_observed
                );
                return Err(Error::Convergence(ConvergenceError::Timeout {
                    attempts,
                    expected,
                    observed_leader: last_observed.leader,
                    observed_peers: last_observed.peers,
                }));
            }
        }
    }
}

fn matches(observed: &ProbeStatus, expected: &[String], mode: ConvergenceMode) -> bool {
    match mode {
        ConvergenceMode::Election => observed
            .leader
            .as_ref()
            .is_some_and(|leader| expected.contains(leader)),
        ConvergenceMode::StrictMembership => {
            let mut peers = observed.peers.clone();
            peers.sort();
            peers.as_slice() == expected
        }
    }
}
