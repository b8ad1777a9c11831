// src/discovery/node.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

pub const PROVIDER_ID_SEPARATOR: &str = "//";

/// A cluster node as reported by the node inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub name: String,
    /// `<prefix>//<instance-id>`
    #[serde(default)]
    pub provider_id: String,
}

impl NodeDescriptor {
    pub fn new(name: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider_id: provider_id.into(),
        }
    }

    /// The instance id part of the provider id, if it has one.
    pub fn instance_id(&self) -> Option<&str> {
        let mut parts = self.provider_id.split(PROVIDER_ID_SEPARATOR);
        parts.next()?;
        parts.next().filter(|id| !id.is_empty())
    }
}

/// Collect the instance ids of all nodes eligible to receive traffic.
///
/// Nodes without a usable provider id are left out with a warning.
pub fn build_candidates(nodes: &[NodeDescriptor]) -> BTreeSet<String> {
    let mut candidates = BTreeSet::new();
    for node in nodes {
        match node.instance_id() {
            Some(id) => {
                candidates.insert(id.to_string());
            }
            None => warn!(
                "node {} has no usable spec.providerID ({:?}), skipping",
                node.name, node.provider_id
            ),
        }
    }
    candidates
}
