//! Scenario orchestration.
//!
//! A scenario is a declarative, strictly ordered list of steps; the runner
//! is the single interpreter that applies them against the collaborators.
//! The first failing step short-circuits the rest of its scenario and
//! becomes the scenario's failure cause; later scenarios still run.

mod suites;
pub use suites::*;


use std::sync::Arc;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::BackoffPolicy;
use crate::convergence::ConvergenceChecker;
use crate::convergence::ConvergenceMode;
use crate::probe::Consistency;
use crate::probe::WriteProbe;
use crate::sandbox::PartitionControl;
use crate::sandbox::RunState;
use crate::sandbox::SandboxControl;
use crate::topology::ClusterMember;
use crate::LifecycleError;
use crate::Result;

/// One action with a declared effect. Members are referenced by ordinal so
/// suites stay fixed data; a convergence check probes the first expected
/// member as its reference node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioStep {
    Stop(usize),
    Start(usize),
    AwaitConvergence {
        expected: Vec<usize>,
        mode: ConvergenceMode,
    },
    AssertWrite {
        members: Vec<usize>,
        consistency: Consistency,
        expect_success: bool,
    },
    Partition {
        group_a: Vec<usize>,
        group_b: Vec<usize>,
    },
    Heal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: &'static str,
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    pub last_error: Option<String>,
}

/// Drives scenarios against a discovered cluster, one step at a time.
pub struct ScenarioRunner {
    members: Vec<ClusterMember>,
    sandbox: Arc<dyn SandboxControl>,
    checker: ConvergenceChecker,
    writes: Arc<dyn WriteProbe>,
    partition: Arc<dyn PartitionControl>,
    lifecycle_policy: BackoffPolicy,
    cancel: CancellationToken,
}

impl ScenarioRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        members: Vec<ClusterMember>,
        sandbox: Arc<dyn SandboxControl>,
        checker: ConvergenceChecker,
        writes: Arc<dyn WriteProbe>,
        partition: Arc<dyn PartitionControl>,
        lifecycle_policy: BackoffPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            members,
            sandbox,
            checker,
            writes,
            partition,
            lifecycle_policy,
            cancel,
        }
    }

    /// Pre-suite gate: the cluster must already hold an election among the
    /// full membership before fault injection starts.
    pub async fn health_gate(&self) -> Result<()> {
        self.checker
            .await_convergence(&self.members[0], &self.members, ConvergenceMode::Election)
            .await?;
        info!("raft is healthy");
        Ok(())
    }

    /// Runs every scenario sequentially, reporting one verdict per scenario.
    pub async fn run_suite(&self, scenarios: &[Scenario]) -> Vec<ScenarioResult> {
        let mut results = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            results.push(self.run_scenario(scenario).await);
        }
        results
    }

    /// Executes steps strictly in order; a step's failure aborts the
    /// remaining steps and becomes the scenario's failure cause.
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        info!("[{}] -----------------------------", scenario.name);
        for (idx, step) in scenario.steps.iter().enumerate() {
            if self.cancel.is_cancelled() {
                // Already-stopped nodes stay stopped; no rollback.
                let e = LifecycleError::Cancelled { step: idx };
                warn!("[{}] {}", scenario.name, e);
                return ScenarioResult {
                    name: scenario.name.to_string(),
                    passed: false,
                    last_error: Some(e.to_string()),
                };
            }
            if let Err(e) = self.apply_step(step).await {
                error!("[{}] step {} failed: {}", scenario.name, idx + 1, e);
                return ScenarioResult {
                    name: scenario.name.to_string(),
                    passed: false,
                    last_error: Some(e.to_string()),
                };
            }
        }
        ScenarioResult {
            name: scenario.name.to_string(),
            passed: true,
            last_error: None,
        }
    }

    async fn apply_step(&self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::Stop(ordinal) => self.stop_member(*ordinal).await,
            ScenarioStep::Start(ordinal) => self.start_member(*ordinal).await,
            ScenarioStep::AwaitConvergence { expected, mode } => {
                let expected = self.select(expected);
                self.checker
                    .await_convergence(&expected[0], &expected, *mode)
                    .await
            }
            ScenarioStep::AssertWrite {
                members,
                consistency,
                expect_success,
            } => {
                self.writes
                    .assert_write(&self.select(members), *consistency, *expect_success)
                    .await
            }
            ScenarioStep::Partition { group_a, group_b } => {
                self.partition
                    .isolate(&self.select(group_a), &self.select(group_b))
                    .await
            }
            ScenarioStep::Heal => self.partition.heal(&self.members).await,
        }
    }

    fn select(&self, ordinals: &[usize]) -> Vec<ClusterMember> {
        ordinals.iter().map(|o| self.members[*o].clone()).collect()
    }

    async fn stop_member(&self, ordinal: usize) -> Result<()> {
        let member = &self.members[ordinal];
        info!("stopping {}", member.name);
        // The collaborator confirms full exit before returning.
        self.sandbox.stop(&member.id).await
    }

    async fn start_member(&self, ordinal: usize) -> Result<()> {
        let member = &self.members[ordinal];
        info!("starting {}", member.name);
        self.sandbox.start(&member.id).await?;

        // Bounded start poll, separate budget from the convergence checker.
        for _ in 0..self.lifecycle_policy.max_retries {
            match self.sandbox.inspect_state(&member.id).await? {
                RunState::Running => return Ok(()),
                state => debug!("{} not running yet: {:?}", member.name, state),
            }
            sleep(self.lifecycle_policy.poll_interval()).await;
        }
        Err(LifecycleError::StartTimeout {
            name: member.name.clone(),
            attempts: self.lifecycle_policy.max_retries,
        }
        .into())
    }
}
