//! End-to-end suite runs against an in-memory fake cluster.
//!
//! The fake emulates the observable surface of the target deployment: a
//! settle lag before membership changes become visible, docker-style
//! transient failures while a node restarts, and the target's consistency
//! behavior with stopped peers still in the raft configuration.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use quorum_harness::BackoffPolicy;
use quorum_harness::ClusterEnumerator;
use quorum_harness::ClusterMember;
use quorum_harness::ConvergenceChecker;
use quorum_harness::KvWriteProbe;
use quorum_harness::PartitionControl;
use quorum_harness::ProbeError;
use quorum_harness::RemoteExec;
use quorum_harness::ReportSink;
use quorum_harness::Result;
use quorum_harness::RunState;
use quorum_harness::SandboxControl;
use quorum_harness::SandboxInstance;
use quorum_harness::ScenarioRunner;
use quorum_harness::StatusProber;
use quorum_harness::{five_node_suite, three_node_suite};
use tokio_util::sync::CancellationToken;

const CONSENSUS_PORT: u16 = 8300;
const STATUS_ENDPOINT: &str = "127.0.0.1:8500";
/// Probes served from the stale view after a membership change.
const SETTLE_PROBES: usize = 2;

fn endpoint(ordinal: usize) -> String {
    format!("10.0.0.{}:{}", ordinal + 1, CONSENSUS_PORT)
}

#[derive(Debug, Clone)]
struct View {
    leader: Option<String>,
    peers: Vec<String>,
}

#[derive(Debug)]
struct State {
    running: HashSet<usize>,
    isolated: HashSet<usize>,
    /// Nodes mid-restart: inspects left before they report running
    starting: HashMap<usize, usize>,
    /// Nodes that run but never rejoin the peer set (fault knob)
    rejoin_blocked: HashSet<usize>,
    /// Status probes still served from the pre-change view
    settle: usize,
    visible: View,
    /// Status probes to fail with a transient error before serving
    transient_probes: usize,
}

struct FakeCluster {
    size: usize,
    state: Mutex<State>,
}

impl FakeCluster {
    fn new(size: usize) -> Arc<Self> {
        let running: HashSet<usize> = (0..size).collect();
        let visible = Self::view_of(&running, &HashSet::new(), &HashSet::new());
        Arc::new(Self {
            size,
            state: Mutex::new(State {
                running,
                isolated: HashSet::new(),
                starting: HashMap::new(),
                rejoin_blocked: HashSet::new(),
                settle: 0,
                visible,
                transient_probes: 0,
            }),
        })
    }

    fn inject_transient_probes(&self, count: usize) {
        self.state.lock().unwrap().transient_probes = count;
    }

    fn block_rejoin(&self, ordinal: usize) {
        self.state.lock().unwrap().rejoin_blocked.insert(ordinal);
    }

    fn ordinal_of(id: &str) -> usize {
        id.trim_start_matches("cid-").parse().expect("fake instance id")
    }

    /// Majority-side view: running members that are neither isolated nor
    /// blocked from rejoining, lowest ordinal as leader.
    fn view_of(
        running: &HashSet<usize>,
        isolated: &HashSet<usize>,
        blocked: &HashSet<usize>,
    ) -> View {
        let mut side: Vec<usize> = running
            .iter()
            .filter(|o| !isolated.contains(o) && !blocked.contains(o))
            .copied()
            .collect();
        side.sort();
        View {
            leader: side.first().map(|o| endpoint(*o)),
            peers: side.iter().map(|o| endpoint(*o)).collect(),
        }
    }

    /// Observes the cluster as the status endpoint would report it,
    /// honoring the settle lag.
    fn observe(&self) -> std::result::Result<View, ProbeError> {
        let mut state = self.state.lock().unwrap();
        if state.transient_probes > 0 {
            state.transient_probes -= 1;
            return Err(ProbeError::Transient(
                "container is restarting".to_string(),
            ));
        }
        if state.settle > 0 {
            state.settle -= 1;
            return Ok(state.visible.clone());
        }
        Ok(Self::view_of(
            &state.running,
            &state.isolated,
            &state.rejoin_blocked,
        ))
    }

    /// Applies a membership change; the old view stays visible for
    /// `SETTLE_PROBES` probes.
    fn mutate(&self, change: impl FnOnce(&mut State)) {
        let mut state = self.state.lock().unwrap();
        state.visible = Self::view_of(&state.running, &state.isolated, &state.rejoin_blocked);
        change(&mut state);
        state.settle = SETTLE_PROBES;
    }

    /// The emulated target keeps stopped peers in its raft configuration,
    /// so consistent operations demand all-but-one members on the caller's
    /// side; stale operations only need the caller alive.
    fn consistent_ok(&self, ordinal: usize) -> bool {
        let state = self.state.lock().unwrap();
        if !state.running.contains(&ordinal) {
            return false;
        }
        let on_minority = state.isolated.contains(&ordinal);
        let side_running = state
            .running
            .iter()
            .filter(|o| state.isolated.contains(o) == on_minority)
            .count();
        side_running >= self.size - 1
    }
}

#[async_trait]
impl SandboxControl for FakeCluster {
    async fn list(&self, _label: &str) -> Result<Vec<SandboxInstance>> {
        // Reverse order on purpose; discovery must sort by name.
        Ok((0..self.size)
            .rev()
            .map(|ordinal| SandboxInstance {
                id: format!("cid-{ordinal}"),
                name: format!("consul_{}", ordinal + 1),
                address: format!("10.0.0.{}", ordinal + 1),
            })
            .collect())
    }

    async fn stop(&self, id: &str) -> Result<()> {
        let ordinal = Self::ordinal_of(id);
        self.mutate(|state| {
            state.running.remove(&ordinal);
            state.starting.remove(&ordinal);
        });
        Ok(())
    }

    async fn start(&self, id: &str) -> Result<()> {
        let ordinal = Self::ordinal_of(id);
        self.state.lock().unwrap().starting.insert(ordinal, 1);
        Ok(())
    }

    async fn inspect_state(&self, id: &str) -> Result<RunState> {
        let ordinal = Self::ordinal_of(id);
        let restarting = {
            let mut state = self.state.lock().unwrap();
            match state.starting.get_mut(&ordinal) {
                Some(countdown) if *countdown > 0 => {
                    *countdown -= 1;
                    true
                }
                Some(_) => {
                    state.starting.remove(&ordinal);
                    false
                }
                None => return Ok(if state.running.contains(&ordinal) {
                    RunState::Running
                } else {
                    RunState::Exited
                }),
            }
        };
        if restarting {
            Ok(RunState::Restarting)
        } else {
            self.mutate(|state| {
                state.running.insert(ordinal);
            });
            Ok(RunState::Running)
        }
    }
}

#[async_trait]
impl RemoteExec for FakeCluster {
    async fn exec(&self, id: &str, argv: &[String]) -> Result<String> {
        let ordinal = Self::ordinal_of(id);
        let url = argv.last().expect("curl argv ends with the url").clone();

        if url.ends_with("/v1/status/leader") {
            let view = self.observe()?;
            return Ok(view.leader.map(|l| format!("\"{l}\"")).unwrap_or_default());
        }
        if url.ends_with("/v1/status/peers") {
            let view = self.observe()?;
            let quoted: Vec<String> = view.peers.iter().map(|p| format!("\"{p}\"")).collect();
            return Ok(format!("[{}]", quoted.join(",")));
        }

        // KV surface used by the write probe
        if let Some(kv) = url.find("/v1/kv/").map(|i| &url[i + "/v1/kv/".len()..]) {
            if !self.state.lock().unwrap().running.contains(&ordinal) {
                return Err(ProbeError::Transient(format!(
                    "container cid-{ordinal} is not running"
                ))
                .into());
            }
            let (key, query) = match kv.split_once('?') {
                Some((key, query)) => (key, query),
                None => (kv, ""),
            };
            if argv.contains(&"PUT".to_string()) {
                return Ok("true".to_string());
            }
            if query.contains("consistent") && !self.consistent_ok(ordinal) {
                return Ok("No cluster leader".to_string());
            }
            return Ok(key.to_string());
        }

        Err(ProbeError::Hard(format!("unexpected exec url {url}")).into())
    }
}

#[async_trait]
impl PartitionControl for FakeCluster {
    async fn isolate(&self, group_a: &[ClusterMember], _group_b: &[ClusterMember]) -> Result<()> {
        let minority: HashSet<usize> = group_a.iter().map(|m| m.ordinal).collect();
        self.mutate(|state| state.isolated = minority);
        Ok(())
    }

    async fn heal(&self, _members: &[ClusterMember]) -> Result<()> {
        self.mutate(|state| state.isolated.clear());
        Ok(())
    }
}

fn fast_policy(max_retries: usize) -> BackoffPolicy {
    BackoffPolicy {
        max_retries,
        timeout_ms: 100,
        base_delay_ms: 10,
    }
}

async fn runner_for(cluster: &Arc<FakeCluster>, budget: usize) -> ScenarioRunner {
    let sandbox: Arc<dyn SandboxControl> = cluster.clone();
    let exec: Arc<dyn RemoteExec> = cluster.clone();
    let members = ClusterEnumerator::new(sandbox.clone(), "label")
        .discover()
        .await
        .expect("fake cluster discovery");

    let prober = Arc::new(StatusProber::new(
        exec.clone(),
        STATUS_ENDPOINT,
        CONSENSUS_PORT,
    ));
    let checker = ConvergenceChecker::new(prober, fast_policy(budget), CONSENSUS_PORT);
    let writes = Arc::new(KvWriteProbe::new(exec, STATUS_ENDPOINT));

    ScenarioRunner::new(
        members,
        sandbox,
        checker,
        writes,
        cluster.clone(),
        fast_policy(budget),
        CancellationToken::new(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_three_node_suite_passes_end_to_end() {
    let cluster = FakeCluster::new(3);
    let runner = runner_for(&cluster, 6).await;

    runner.health_gate().await.expect("healthy raft");

    let mut report = ReportSink::new();
    for result in runner.run_suite(&three_node_suite()).await {
        report.record(result);
    }

    assert!(report.overall_passed(), "{}", report.summary());
    assert_eq!(report.results().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_five_node_suite_passes_with_injected_transients() {
    let cluster = FakeCluster::new(5);
    let runner = runner_for(&cluster, 4).await;

    // Six transient probes against a budget of four decisive attempts:
    // the gate only passes because transients are exempt.
    cluster.inject_transient_probes(6);
    runner.health_gate().await.expect("healthy raft");

    let mut report = ReportSink::new();
    for result in runner.run_suite(&five_node_suite()).await {
        report.record(result);
    }

    assert!(report.overall_passed(), "{}", report.summary());
    assert_eq!(report.results().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_node_that_never_rejoins_fails_its_scenario() {
    let cluster = FakeCluster::new(3);
    let runner = runner_for(&cluster, 3).await;
    cluster.block_rejoin(2);

    let result = runner.run_scenario(&three_node_suite()[0]).await;
    assert!(!result.passed);
    assert!(result
        .last_error
        .expect("failure cause recorded")
        .contains("did not converge"));
}

#[tokio::test(start_paused = true)]
async fn test_discovery_orders_members_by_name() {
    let cluster = FakeCluster::new(5);
    let sandbox: Arc<dyn SandboxControl> = cluster.clone();
    let members = ClusterEnumerator::new(sandbox, "label")
        .discover()
        .await
        .expect("discovery");
    let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["consul_1", "consul_2", "consul_3", "consul_4", "consul_5"]
    );
    assert_eq!(members[0].ordinal, 0);
    assert_eq!(members[4].ordinal, 4);
}
