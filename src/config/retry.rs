use std::time::Duration;

use serde::Deserialize;

/// Basic retry policy template
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct BackoffPolicy {
    /// Maximum number of decisive attempts before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Single remote operation timeout (unit: milliseconds)
    #[serde(default = "default_op_timeout_ms")]
    pub timeout_ms: u64,

    /// Delay between attempts (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_ms: default_op_timeout_ms(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl BackoffPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Divide strategies by harness concern
#[derive(Debug, Deserialize, Clone)]
pub struct RetryPolicies {
    /// Convergence polling (status probes against a reference node)
    #[serde(default = "default_convergence")]
    pub convergence: BackoffPolicy,

    /// Node start polling (inspecting the sandbox until it reports running)
    #[serde(default = "default_lifecycle")]
    pub lifecycle: BackoffPolicy,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            convergence: default_convergence(),
            lifecycle: default_lifecycle(),
        }
    }
}

// 10 attempts at 1-second spacing; larger budgets for slower clusters go
// through the config overlay.
fn default_convergence() -> BackoffPolicy {
    BackoffPolicy {
        max_retries: 10,
        timeout_ms: 5000,
        base_delay_ms: 1000,
    }
}

fn default_lifecycle() -> BackoffPolicy {
    BackoffPolicy {
        max_retries: 30,
        timeout_ms: 10000,
        base_delay_ms: 1000,
    }
}

fn default_max_retries() -> usize {
    10
}
fn default_op_timeout_ms() -> u64 {
    5000
}
fn default_base_delay_ms() -> u64 {
    1000
}
