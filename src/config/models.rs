// src/config/models.rs
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::client::BackendServer;
use crate::discovery::{NodeDescriptor, ServiceDescriptor};

pub const DEFAULT_BACKEND_COUNT: usize = 50;
pub const BACKEND_COUNT_LIMIT: usize = 100;
pub const DEFAULT_BACKEND_WEIGHT: u32 = 100;
pub const DRAINED_BACKEND_WEIGHT: u32 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub load_balancers: Vec<LoadBalancerTarget>,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.reconcile.validate()?;

        let mut seen = HashSet::new();
        for target in &self.load_balancers {
            if target.id.trim().is_empty() {
                bail!("load balancer id must not be empty");
            }
            if !seen.insert(target.id.as_str()) {
                bail!("duplicate load balancer id: {}", target.id);
            }
        }

        if self.metrics.enabled && !self.metrics.path.starts_with('/') {
            bail!("metrics path must start with '/': {}", self.metrics.path);
        }

        Ok(())
    }
}

/// Which diff policy the planner applies to existing registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    /// Drain through weight 0 first, delete on a later pass.
    #[default]
    WeightAware,
    /// Delete non-candidates outright.
    PresenceOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub policy: ReconcilePolicy,
    #[serde(default = "default_backend_count")]
    pub default_backend_count: usize,
    #[serde(default = "default_backend_count_limit")]
    pub backend_count_limit: usize,
    #[serde(default = "default_backend_weight")]
    pub default_weight: u32,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl ReconcileConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_backend_count == 0 {
            bail!("default_backend_count must be greater than 0");
        }
        if self.default_backend_count >= self.backend_count_limit {
            bail!(
                "default_backend_count ({}) must be below backend_count_limit ({})",
                self.default_backend_count,
                self.backend_count_limit
            );
        }
        if self.default_weight == DRAINED_BACKEND_WEIGHT {
            bail!("default_weight must be greater than 0");
        }
        if self.interval_secs == 0 {
            bail!("interval_secs must be greater than 0");
        }
        Ok(())
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            policy: ReconcilePolicy::default(),
            default_backend_count: default_backend_count(),
            backend_count_limit: default_backend_count_limit(),
            default_weight: default_backend_weight(),
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

/// One load balancer kept in sync with the nodes behind a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancerTarget {
    pub id: String,
    pub service: ServiceDescriptor,
    #[serde(default)]
    pub nodes: Vec<NodeDescriptor>,
    /// Registrations the bundled in-memory load balancer starts with.
    #[serde(default)]
    pub backends: Vec<BackendServer>,
}

fn default_backend_count() -> usize {
    DEFAULT_BACKEND_COUNT
}

fn default_backend_count_limit() -> usize {
    BACKEND_COUNT_LIMIT
}

fn default_backend_weight() -> u32 {
    DEFAULT_BACKEND_WEIGHT
}

fn default_interval_secs() -> u64 {
    30
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}
