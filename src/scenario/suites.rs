//! The fixed scenario battery, one suite per supported topology.
//!
//! Step order follows the historical Consul raft tests; ordinal 0 is the
//! bootstrap node.

use super::Scenario;
use super::ScenarioStep::*;
use crate::convergence::ConvergenceMode::StrictMembership;
use crate::probe::Consistency;

/// Suite for the cluster size discovered at run time, if supported.
pub fn suite_for(cluster_size: usize) -> Option<Vec<Scenario>> {
    match cluster_size {
        3 => Some(three_node_suite()),
        5 => Some(five_node_suite()),
        _ => None,
    }
}

pub fn three_node_suite() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "3.1 non-bootstrap node rejoins after reboot",
            steps: vec![
                Stop(2),
                AwaitConvergence {
                    expected: vec![0, 1],
                    mode: StrictMembership,
                },
                AssertWrite {
                    members: vec![0, 1],
                    consistency: Consistency::Consistent,
                    expect_success: true,
                },
                Start(2),
                AwaitConvergence {
                    expected: vec![0, 1, 2],
                    mode: StrictMembership,
                },
            ],
        },
        Scenario {
            name: "3.2 bootstrap node rejoins after reboot",
            steps: vec![
                Stop(0),
                AwaitConvergence {
                    expected: vec![1, 2],
                    mode: StrictMembership,
                },
                AssertWrite {
                    members: vec![1, 2],
                    consistency: Consistency::Consistent,
                    expect_success: true,
                },
                Start(0),
                AwaitConvergence {
                    expected: vec![0, 1, 2],
                    mode: StrictMembership,
                },
            ],
        },
        Scenario {
            name: "3.3 cluster reforms without bootstrap node",
            steps: vec![
                Stop(0),
                Stop(1),
                Stop(2),
                Start(1),
                Start(2),
                AwaitConvergence {
                    expected: vec![1, 2],
                    mode: StrictMembership,
                },
                Start(0),
                AwaitConvergence {
                    expected: vec![0, 1, 2],
                    mode: StrictMembership,
                },
            ],
        },
    ]
}

pub fn five_node_suite() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "5.1 consistent reads require quorum",
            steps: vec![
                Stop(0),
                Stop(1),
                AssertWrite {
                    members: vec![2, 3, 4],
                    consistency: Consistency::Stale,
                    expect_success: true,
                },
                AssertWrite {
                    members: vec![2, 3, 4],
                    consistency: Consistency::Consistent,
                    expect_success: false,
                },
                Start(1),
                AwaitConvergence {
                    expected: vec![1, 2, 3, 4],
                    mode: StrictMembership,
                },
                AssertWrite {
                    members: vec![2, 3, 4],
                    consistency: Consistency::Consistent,
                    expect_success: true,
                },
                Start(0),
                AwaitConvergence {
                    expected: vec![0, 1, 2, 3, 4],
                    mode: StrictMembership,
                },
            ],
        },
        Scenario {
            name: "5.2 majority writes win after partition heals",
            steps: vec![
                Partition {
                    group_a: vec![0, 1],
                    group_b: vec![2, 3, 4],
                },
                AssertWrite {
                    members: vec![0, 1],
                    consistency: Consistency::Stale,
                    expect_success: true,
                },
                AssertWrite {
                    members: vec![0, 1],
                    consistency: Consistency::Consistent,
                    expect_success: false,
                },
                Heal,
                AwaitConvergence {
                    expected: vec![0, 1, 2, 3, 4],
                    mode: StrictMembership,
                },
                AssertWrite {
                    members: vec![0, 1],
                    consistency: Consistency::Consistent,
                    expect_success: true,
                },
            ],
        },
    ]
}
