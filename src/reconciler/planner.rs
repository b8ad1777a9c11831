// src/reconciler/planner.rs
use std::collections::BTreeSet;
use tracing::warn;

use crate::client::BackendServer;
use crate::config::{ReconcileConfig, ReconcilePolicy};

/// Mutations that move a load balancer toward its target membership.
///
/// An instance id appears in at most one of the three lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub to_add: Vec<BackendServer>,
    pub to_change_weight: Vec<BackendServer>,
    pub to_delete: Vec<String>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_change_weight.is_empty() && self.to_delete.is_empty()
    }

    pub fn add_ids(&self) -> Vec<&str> {
        self.to_add.iter().map(|b| b.instance_id.as_str()).collect()
    }

    pub fn drain_ids(&self) -> Vec<&str> {
        self.to_change_weight
            .iter()
            .map(|b| b.instance_id.as_str())
            .collect()
    }
}

/// Classifies the registrations of a load balancer against the candidate
/// set and the target capacity.
///
/// Whenever several instances qualify equally, the ones with the lowest ids
/// are added and the ones with the highest ids are drained. Callers should
/// only depend on how many are picked.
#[derive(Debug, Clone)]
pub struct DiffPlanner {
    policy: ReconcilePolicy,
    default_weight: u32,
    registration_limit: usize,
}

impl DiffPlanner {
    pub fn new(config: &ReconcileConfig) -> Self {
        Self {
            policy: config.policy,
            default_weight: config.default_weight,
            registration_limit: config.backend_count_limit,
        }
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    pub fn plan(
        &self,
        candidates: &BTreeSet<String>,
        actual: &[BackendServer],
        target: usize,
    ) -> ReconcilePlan {
        match self.policy {
            ReconcilePolicy::WeightAware => self.plan_weight_aware(candidates, actual, target),
            ReconcilePolicy::PresenceOnly => self.plan_presence_only(candidates, actual, target),
        }
    }

    fn plan_weight_aware(
        &self,
        candidates: &BTreeSet<String>,
        actual: &[BackendServer],
        target: usize,
    ) -> ReconcilePlan {
        // Zero weight means the backend was drained by an earlier pass.
        let mut to_delete = BTreeSet::new();
        let mut valid = BTreeSet::new();
        for backend in actual {
            if backend.is_drained() {
                to_delete.insert(backend.instance_id.clone());
            } else {
                valid.insert(backend.instance_id.as_str());
            }
        }

        let (eligible, ineligible): (Vec<&str>, Vec<&str>) = valid
            .into_iter()
            .partition(|id| candidates.contains(*id));

        let surplus = eligible.len().saturating_sub(target);
        let (serving, over_capacity) = eligible.split_at(eligible.len() - surplus);

        let to_change_weight = ineligible
            .iter()
            .chain(over_capacity)
            .map(|id| BackendServer::drained(*id))
            .collect();

        let registered = registered_ids(actual);
        let wanted = target.saturating_sub(serving.len());
        let to_add = self.select_additions(candidates, &registered, wanted);

        ReconcilePlan {
            to_add,
            to_change_weight,
            to_delete: to_delete.into_iter().collect(),
        }
    }

    fn plan_presence_only(
        &self,
        candidates: &BTreeSet<String>,
        actual: &[BackendServer],
        target: usize,
    ) -> ReconcilePlan {
        let registered = registered_ids(actual);

        let to_delete = registered
            .iter()
            .filter(|id| !candidates.contains(**id))
            .map(|id| id.to_string())
            .collect();

        let wanted = target.saturating_sub(registered.len());
        let to_add = self.select_additions(candidates, &registered, wanted);

        ReconcilePlan {
            to_add,
            to_change_weight: Vec::new(),
            to_delete,
        }
    }

    /// Pick up to `wanted` unregistered candidates, keeping the peak
    /// registration count of the pass within the limit.
    fn select_additions(
        &self,
        candidates: &BTreeSet<String>,
        registered: &BTreeSet<&str>,
        wanted: usize,
    ) -> Vec<BackendServer> {
        let headroom = self.registration_limit.saturating_sub(registered.len());
        if wanted > headroom {
            warn!(
                "want {} more backends but only {} registrations are left under the limit of {}",
                wanted, headroom, self.registration_limit
            );
        }

        candidates
            .iter()
            .filter(|id| !registered.contains(id.as_str()))
            .take(wanted.min(headroom))
            .map(|id| BackendServer::new(id.clone(), self.default_weight))
            .collect()
    }
}

fn registered_ids(actual: &[BackendServer]) -> BTreeSet<&str> {
    actual.iter().map(|b| b.instance_id.as_str()).collect()
}
