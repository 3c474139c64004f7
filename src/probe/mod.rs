//! Observation probes against individual cluster members.
//!
//! `StatusProber` reads a node's self-reported leader and peer set;
//! `KvWriteProbe` exercises the write path under a declared consistency
//! level. Both go through the remote-exec collaborator and never mutate
//! cluster membership.

mod status;
mod writes;
pub use status::*;
pub use writes::*;
