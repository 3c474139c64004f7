use std::process::ExitCode;
use std::sync::Arc;

use quorum_harness::suite_for;
use quorum_harness::ClusterEnumerator;
use quorum_harness::ConvergenceChecker;
use quorum_harness::DockerSandbox;
use quorum_harness::KvWriteProbe;
use quorum_harness::ReportSink;
use quorum_harness::ScenarioRunner;
use quorum_harness::Settings;
use quorum_harness::StatusProber;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    init_observability();

    let settings = match Settings::load(None) {
        Ok(settings) => settings,
        Err(e) => {
            error!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Listen on interrupt: finish nothing, roll back nothing.
    let cancel = CancellationToken::new();
    tokio::spawn(listen_for_shutdown(cancel.clone()));

    let sandbox = Arc::new(DockerSandbox::new(settings.cluster.network.clone()));

    let enumerator =
        ClusterEnumerator::new(sandbox.clone(), settings.cluster.service_label.clone());
    let members = match enumerator.discover().await {
        Ok(members) => members,
        Err(e) => {
            // We need exactly 3 or 5 nodes to be up. Exiting without tests.
            error!("cannot run scenario suite: {e}");
            return ExitCode::FAILURE;
        }
    };

    let Some(scenarios) = suite_for(members.len()) else {
        error!("no scenario suite for a {}-node cluster", members.len());
        return ExitCode::FAILURE;
    };
    info!(
        "Running {}-node raft conformance suite. Bootstrap node is {}",
        members.len(),
        members[0].name
    );

    let prober = Arc::new(StatusProber::new(
        sandbox.clone(),
        settings.cluster.status_endpoint.clone(),
        settings.cluster.consensus_port,
    ));
    let checker = ConvergenceChecker::new(
        prober,
        settings.retry.convergence,
        settings.cluster.consensus_port,
    );
    let writes = Arc::new(KvWriteProbe::new(
        sandbox.clone(),
        settings.cluster.status_endpoint.clone(),
    ));

    let runner = ScenarioRunner::new(
        members,
        sandbox.clone(),
        checker,
        writes,
        sandbox,
        settings.retry.lifecycle,
        cancel,
    );

    if let Err(e) = runner.health_gate().await {
        error!("cluster is not healthy, refusing to inject faults: {e}");
        return ExitCode::FAILURE;
    }

    let mut report = ReportSink::new();
    for result in runner.run_suite(&scenarios).await {
        report.record(result);
    }

    println!("{}", report.summary());
    if report.overall_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn listen_for_shutdown(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("interrupt received, aborting after the in-flight step");
            cancel.cancel();
        }
        Err(e) => error!("failed to install interrupt handler: {e}"),
    }
}

fn init_observability() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
