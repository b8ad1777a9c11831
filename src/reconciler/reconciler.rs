// src/reconciler/reconciler.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use super::capacity::resolve_target_capacity;
use super::error::ReconcileError;
use super::executor::{fetch_backend_servers, PlanExecutor};
use super::planner::{DiffPlanner, ReconcilePlan};
use crate::client::LoadBalancerClient;
use crate::config::ReconcileConfig;
use crate::discovery::{build_candidates, NodeDescriptor, ServiceAnnotations, ServiceDescriptor};
use crate::metrics::{MetricsCollector, Timer};

/// Outcome of a pass that ran to completion.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub pass_id: Uuid,
    pub lb_id: String,
    pub candidate_count: usize,
    pub target: usize,
    pub plan: ReconcilePlan,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Keeps one load balancer's backend membership in line with a service's
/// nodes, one pass at a time.
///
/// Passes against the same load balancer must not overlap.
pub struct BackendReconciler {
    client: Arc<dyn LoadBalancerClient>,
    config: ReconcileConfig,
    planner: DiffPlanner,
    executor: PlanExecutor,
    metrics: Option<Arc<MetricsCollector>>,
}

impl BackendReconciler {
    pub fn new(
        client: Arc<dyn LoadBalancerClient>,
        config: ReconcileConfig,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        let planner = DiffPlanner::new(&config);
        let executor = PlanExecutor::new(client.clone());
        Self {
            client,
            config,
            planner,
            executor,
            metrics,
        }
    }

    pub async fn reconcile(
        &self,
        service: &ServiceDescriptor,
        nodes: &[NodeDescriptor],
        lb_id: &str,
    ) -> Result<ReconcileReport, ReconcileError> {
        let pass_id = Uuid::new_v4();
        let span = info_span!(
            "reconcile",
            %pass_id,
            service = %service.qualified_name(),
            lb_id
        );

        let timer = Timer::new();
        let result = self
            .run_pass(pass_id, service, nodes, lb_id)
            .instrument(span)
            .await;

        if let Some(metrics) = &self.metrics {
            let outcome = match &result {
                Ok(report) => {
                    metrics.record_plan(lb_id, &report.plan);
                    "success"
                }
                Err(e) => e.kind(),
            };
            metrics.record_pass(lb_id, outcome, timer.elapsed());
        }

        result
    }

    async fn run_pass(
        &self,
        pass_id: Uuid,
        service: &ServiceDescriptor,
        nodes: &[NodeDescriptor],
        lb_id: &str,
    ) -> Result<ReconcileReport, ReconcileError> {
        let started_at = Utc::now();

        let annotations = ServiceAnnotations::extract(service).map_err(|source| {
            ReconcileError::Annotation {
                service: service.qualified_name(),
                source,
            }
        })?;

        let candidates = build_candidates(nodes);
        let target = resolve_target_capacity(annotations.backend_count, candidates.len(), &self.config);
        info!(
            "nodes num is {}, candidates num is {}, target backend num is {} (policy {:?})",
            nodes.len(),
            candidates.len(),
            target,
            self.planner.policy()
        );
        if let Some(metrics) = &self.metrics {
            metrics.update_capacity(lb_id, target, candidates.len());
        }

        let actual = fetch_backend_servers(self.client.as_ref(), lb_id).await?;
        let plan = self.planner.plan(&candidates, &actual, target);

        info!("find backends {:?} to delete from {}", plan.to_delete, lb_id);
        info!("find backends {:?} to change weight to 0 on {}", plan.drain_ids(), lb_id);
        info!("find backends {:?} to add to {}", plan.add_ids(), lb_id);

        if let Err(e) = self.executor.execute(lb_id, &plan).await {
            error!("reconcile of {} aborted: {}", lb_id, e);
            return Err(e);
        }

        Ok(ReconcileReport {
            pass_id,
            lb_id: lb_id.to_string(),
            candidate_count: candidates.len(),
            target,
            plan,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
