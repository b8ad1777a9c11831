// src/client/memory.rs
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::api::{ClientError, LoadBalancerClient};
use super::backend::BackendServer;
use crate::config::BACKEND_COUNT_LIMIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Describe,
    Add,
    Update,
    Remove,
}

/// A mutating call as it was received, kept for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Add(String, Vec<BackendServer>),
    Update(String, Vec<BackendServer>),
    Remove(String, Vec<String>),
}

impl BackendCall {
    pub fn operation(&self) -> Operation {
        match self {
            BackendCall::Add(..) => Operation::Add,
            BackendCall::Update(..) => Operation::Update,
            BackendCall::Remove(..) => Operation::Remove,
        }
    }
}

/// Load balancer registry held in process memory.
///
/// Behaves like the cloud API for backend membership: batch calls are
/// validated as a whole before anything is applied, adds past the
/// registration limit are rejected, and a failure can be armed per
/// operation to fire on the next call.
#[derive(Clone)]
pub struct InMemoryLoadBalancer {
    balancers: Arc<DashMap<String, BTreeMap<String, u32>>>,
    failures: Arc<DashMap<Operation, ClientError>>,
    calls: Arc<Mutex<Vec<BackendCall>>>,
    registration_limit: usize,
}

impl InMemoryLoadBalancer {
    pub fn new() -> Self {
        Self {
            balancers: Arc::new(DashMap::new()),
            failures: Arc::new(DashMap::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
            registration_limit: BACKEND_COUNT_LIMIT,
        }
    }

    pub fn with_registration_limit(mut self, limit: usize) -> Self {
        self.registration_limit = limit;
        self
    }

    /// Create (or replace) a load balancer with the given registrations.
    pub fn insert_load_balancer(&self, lb_id: &str, backends: Vec<BackendServer>) {
        let registry = backends
            .into_iter()
            .map(|b| (b.instance_id, b.weight))
            .collect();
        self.balancers.insert(lb_id.to_string(), registry);
        tracing::debug!("Registered in-memory load balancer {}", lb_id);
    }

    /// Current registrations, ordered by instance id.
    pub fn backends(&self, lb_id: &str) -> Option<Vec<BackendServer>> {
        self.balancers.get(lb_id).map(|registry| {
            registry
                .iter()
                .map(|(id, weight)| BackendServer::new(id.clone(), *weight))
                .collect()
        })
    }

    /// Make the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: Operation, error: ClientError) {
        self.failures.insert(operation, error);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn clear_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn take_failure(&self, operation: Operation) -> Result<(), ClientError> {
        match self.failures.remove(&operation) {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }

    fn record(&self, call: BackendCall) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }
}

impl Default for InMemoryLoadBalancer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoadBalancerClient for InMemoryLoadBalancer {
    async fn describe_backend_servers(&self, lb_id: &str) -> Result<Vec<BackendServer>, ClientError> {
        self.take_failure(Operation::Describe)?;
        self.backends(lb_id)
            .ok_or_else(|| ClientError::LoadBalancerNotFound(lb_id.to_string()))
    }

    async fn add_backend_servers(
        &self,
        lb_id: &str,
        backends: Vec<BackendServer>,
    ) -> Result<(), ClientError> {
        self.record(BackendCall::Add(lb_id.to_string(), backends.clone()));
        self.take_failure(Operation::Add)?;

        let mut registry = self
            .balancers
            .get_mut(lb_id)
            .ok_or_else(|| ClientError::LoadBalancerNotFound(lb_id.to_string()))?;

        if let Some(existing) = backends.iter().find(|b| registry.contains_key(&b.instance_id)) {
            return Err(ClientError::api(
                "BackendServerExists",
                format!("backend {} is already registered", existing.instance_id),
            ));
        }
        if registry.len() + backends.len() > self.registration_limit {
            return Err(ClientError::api(
                "BackendServerQuotaExceeded",
                format!(
                    "{} registrations would exceed the limit of {}",
                    registry.len() + backends.len(),
                    self.registration_limit
                ),
            ));
        }

        for backend in backends {
            registry.insert(backend.instance_id, backend.weight);
        }
        Ok(())
    }

    async fn update_backend_servers(
        &self,
        lb_id: &str,
        backends: Vec<BackendServer>,
    ) -> Result<(), ClientError> {
        self.record(BackendCall::Update(lb_id.to_string(), backends.clone()));
        self.take_failure(Operation::Update)?;

        let mut registry = self
            .balancers
            .get_mut(lb_id)
            .ok_or_else(|| ClientError::LoadBalancerNotFound(lb_id.to_string()))?;

        if let Some(missing) = backends.iter().find(|b| !registry.contains_key(&b.instance_id)) {
            return Err(ClientError::api(
                "BackendServerNotFound",
                format!("backend {} is not registered", missing.instance_id),
            ));
        }

        for backend in backends {
            registry.insert(backend.instance_id, backend.weight);
        }
        Ok(())
    }

    async fn remove_backend_servers(
        &self,
        lb_id: &str,
        instance_ids: Vec<String>,
    ) -> Result<(), ClientError> {
        self.record(BackendCall::Remove(lb_id.to_string(), instance_ids.clone()));
        self.take_failure(Operation::Remove)?;

        let mut registry = self
            .balancers
            .get_mut(lb_id)
            .ok_or_else(|| ClientError::LoadBalancerNotFound(lb_id.to_string()))?;

        if let Some(missing) = instance_ids.iter().find(|id| !registry.contains_key(*id)) {
            return Err(ClientError::api(
                "BackendServerNotFound",
                format!("backend {} is not registered", missing),
            ));
        }

        for id in &instance_ids {
            registry.remove(id);
        }
        Ok(())
    }
}
