// src/reconciler/executor.rs
use std::sync::Arc;
use tracing::{debug, info};

use super::error::ReconcileError;
use super::planner::ReconcilePlan;
use crate::client::{BackendServer, LoadBalancerClient};

/// Reads the registrations currently held by a load balancer.
pub async fn fetch_backend_servers(
    client: &dyn LoadBalancerClient,
    lb_id: &str,
) -> Result<Vec<BackendServer>, ReconcileError> {
    let backends = client
        .describe_backend_servers(lb_id)
        .await
        .map_err(|source| ReconcileError::Describe {
            lb_id: lb_id.to_string(),
            source,
        })?;
    debug!("load balancer {} has {} registrations", lb_id, backends.len());
    Ok(backends)
}

/// Applies a plan as at most three batch calls: add, then weight change,
/// then remove. The first failing call ends the run.
pub struct PlanExecutor {
    client: Arc<dyn LoadBalancerClient>,
}

impl PlanExecutor {
    pub fn new(client: Arc<dyn LoadBalancerClient>) -> Self {
        Self { client }
    }

    pub async fn execute(&self, lb_id: &str, plan: &ReconcilePlan) -> Result<(), ReconcileError> {
        if !plan.to_add.is_empty() {
            self.client
                .add_backend_servers(lb_id, plan.to_add.clone())
                .await
                .map_err(|source| ReconcileError::AddBackends {
                    lb_id: lb_id.to_string(),
                    source,
                })?;
            info!("added {} backends to {}", plan.to_add.len(), lb_id);
        }

        if !plan.to_change_weight.is_empty() {
            self.client
                .update_backend_servers(lb_id, plan.to_change_weight.clone())
                .await
                .map_err(|source| ReconcileError::UpdateWeights {
                    lb_id: lb_id.to_string(),
                    source,
                })?;
            info!("drained {} backends on {}", plan.to_change_weight.len(), lb_id);
        }

        if !plan.to_delete.is_empty() {
            self.client
                .remove_backend_servers(lb_id, plan.to_delete.clone())
                .await
                .map_err(|source| ReconcileError::RemoveBackends {
                    lb_id: lb_id.to_string(),
                    source,
                })?;
            info!("removed {} backends from {}", plan.to_delete.len(), lb_id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{BackendCall, ClientError, InMemoryLoadBalancer, Operation};

    fn full_plan() -> ReconcilePlan {
        ReconcilePlan {
            to_add: vec![BackendServer::new("i-new", 100)],
            to_change_weight: vec![BackendServer::drained("i-live")],
            to_delete: vec!["i-dead".to_string()],
        }
    }

    fn seeded() -> InMemoryLoadBalancer {
        let lb = InMemoryLoadBalancer::new();
        lb.insert_load_balancer(
            "lb-1",
            vec![BackendServer::new("i-live", 100), BackendServer::drained("i-dead")],
        );
        lb
    }

    #[tokio::test]
    async fn test_calls_issued_in_order() {
        let lb = seeded();
        let executor = PlanExecutor::new(Arc::new(lb.clone()));

        executor.execute("lb-1", &full_plan()).await.unwrap();

        let operations: Vec<Operation> = lb.calls().iter().map(BackendCall::operation).collect();
        assert_eq!(operations, vec![Operation::Add, Operation::Update, Operation::Remove]);
        assert_eq!(
            lb.backends("lb-1").unwrap(),
            vec![BackendServer::drained("i-live"), BackendServer::new("i-new", 100)]
        );
    }

    #[tokio::test]
    async fn test_empty_lists_skipped() {
        let lb = seeded();
        let executor = PlanExecutor::new(Arc::new(lb.clone()));
        let plan = ReconcilePlan {
            to_delete: vec!["i-dead".to_string()],
            ..ReconcilePlan::default()
        };

        executor.execute("lb-1", &plan).await.unwrap();

        assert_eq!(
            lb.calls(),
            vec![BackendCall::Remove("lb-1".to_string(), vec!["i-dead".to_string()])]
        );
    }

    #[tokio::test]
    async fn test_update_failure_skips_remove() {
        let lb = seeded();
        let failure = ClientError::api("InternalError", "boom");
        lb.fail_next(Operation::Update, failure.clone());
        let executor = PlanExecutor::new(Arc::new(lb.clone()));

        let err = executor.execute("lb-1", &full_plan()).await.unwrap_err();

        assert!(matches!(err, ReconcileError::UpdateWeights { .. }));
        assert_eq!(err.client_error(), Some(&failure));
        let operations: Vec<Operation> = lb.calls().iter().map(BackendCall::operation).collect();
        assert_eq!(operations, vec![Operation::Add, Operation::Update]);
    }

    #[tokio::test]
    async fn test_fetch_wraps_describe_error() {
        let lb = InMemoryLoadBalancer::new();
        let err = fetch_backend_servers(&lb, "lb-missing").await.unwrap_err();
        assert!(matches!(err, ReconcileError::Describe { ref lb_id, .. } if lb_id == "lb-missing"));
        assert_eq!(
            err.client_error(),
            Some(&ClientError::LoadBalancerNotFound("lb-missing".to_string()))
        );
    }
}
