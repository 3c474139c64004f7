//! Black-box conformance harness for a quorum-based consensus cluster.
//!
//! Drives node stop/start and network partition faults against a running
//! 3- or 5-node cluster and asserts that the cluster's observable
//! leadership and peer-set state converges to the expected outcome.

mod config;
mod convergence;
mod errors;
mod probe;
mod report;
mod sandbox;
mod scenario;
mod topology;

pub use config::*;
pub use convergence::*;
pub use errors::*;
pub use probe::*;
pub use report::*;
pub use sandbox::*;
pub use scenario::*;
pub use topology::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
