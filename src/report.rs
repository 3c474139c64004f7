//! Aggregation of per-scenario verdicts into the run's final summary.

use tracing::error;
use tracing::info;

use crate::scenario::ScenarioResult;

#[derive(Debug, Default)]
pub struct ReportSink {
    results: Vec<ScenarioResult>,
}

impl ReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: ScenarioResult) {
        if result.passed {
            info!("PASS  {}", result.name);
        } else {
            error!(
                "FAIL  {} ({})",
                result.name,
                result.last_error.as_deref().unwrap_or("unknown cause")
            );
        }
        self.results.push(result);
    }

    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }

    /// A run with no recorded scenarios is a failure, not a vacuous pass.
    pub fn overall_passed(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.passed)
    }

    pub fn summary(&self) -> String {
        let passed = self.results.iter().filter(|r| r.passed).count();
        let mut lines: Vec<String> = self
            .results
            .iter()
            .map(|r| match (r.passed, r.last_error.as_deref()) {
                (true, _) => format!("PASS  {}", r.name),
                (false, Some(e)) => format!("FAIL  {} ({})", r.name, e),
                (false, None) => format!("FAIL  {}", r.name),
            })
            .collect();
        lines.push(format!(
            "{}: {}/{} scenarios passed",
            if self.overall_passed() { "PASS" } else { "FAIL" },
            passed,
            self.results.len()
        ));
        lines.join("\n")
    }
}
