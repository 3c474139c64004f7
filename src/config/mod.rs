//! Configuration management for the conformance harness.
//!
//! Provides hierarchical configuration loading with priority:
//! 1. Default values (hardcoded)
//! 2. Config file pointed at by `CONFIG_PATH`
//! 3. Environment variables (highest priority)

mod cluster;
mod retry;
pub use cluster::*;
pub use retry::*;


use std::env;

use ::config::Config;
use ::config::Environment;
use ::config::File;
use serde::Deserialize;

use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Cluster topology and discovery configuration
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Retry policies for convergence and lifecycle polling
    #[serde(default)]
    pub retry: RetryPolicies,
}

impl Settings {
    /// Load configuration from multiple sources with priority:
    /// 1. Optional config file (`CONFIG_PATH`, or an explicit path)
    /// 2. Environment variables prefixed with `HARNESS`
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder();

        if let Some(path) = config_path {
            config = config.add_source(File::with_name(path).required(true));
        } else if let Ok(path) = env::var("CONFIG_PATH") {
            config = config.add_source(File::with_name(&path).required(true));
        }

        config = config.add_source(
            Environment::with_prefix("HARNESS")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        Ok(config.build()?.try_deserialize()?)
    }
}
