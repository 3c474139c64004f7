//! Shared fixtures for unit tests.

use crate::config::BackoffPolicy;
use crate::topology::ClusterMember;

pub const TEST_CONSENSUS_PORT: u16 = 8300;

pub fn member(ordinal: usize) -> ClusterMember {
    ClusterMember {
        id: format!("id-{ordinal}"),
        name: format!("consul_{}", ordinal + 1),
        address: format!("10.0.0.{}", ordinal + 1),
        ordinal,
    }
}

pub fn members(count: usize) -> Vec<ClusterMember> {
    (0..count).map(member).collect()
}

/// Consensus endpoint of `member(ordinal)`.
pub fn endpoint(ordinal: usize) -> String {
    format!("10.0.0.{}:{}", ordinal + 1, TEST_CONSENSUS_PORT)
}

pub fn endpoints(ordinals: &[usize]) -> Vec<String> {
    ordinals.iter().map(|o| endpoint(*o)).collect()
}

/// Small budget, short delays; paused-clock tests auto-advance through the
/// sleeps.
pub fn fast_policy(max_retries: usize) -> BackoffPolicy {
    BackoffPolicy {
        max_retries,
        timeout_ms: 100,
        base_delay_ms: 10,
    }
}
