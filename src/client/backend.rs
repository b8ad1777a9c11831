// src/client/backend.rs
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_BACKEND_WEIGHT, DRAINED_BACKEND_WEIGHT};

/// One backend registration on a load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BackendServer {
    pub instance_id: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl BackendServer {
    pub fn new(instance_id: impl Into<String>, weight: u32) -> Self {
        Self {
            instance_id: instance_id.into(),
            weight,
        }
    }

    /// Registration that receives no new traffic.
    pub fn drained(instance_id: impl Into<String>) -> Self {
        Self::new(instance_id, DRAINED_BACKEND_WEIGHT)
    }

    pub fn is_drained(&self) -> bool {
        self.weight == DRAINED_BACKEND_WEIGHT
    }
}

fn default_weight() -> u32 {
    DEFAULT_BACKEND_WEIGHT
}
