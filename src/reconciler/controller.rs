// src/reconciler/controller.rs
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::reconciler::BackendReconciler;
use crate::config::LoadBalancerTarget;

/// Runs reconcile passes on an interval, one task per load balancer.
///
/// Each task finishes a pass before starting the next, so passes against
/// the same load balancer never overlap. A failed pass is retried on the
/// next tick.
pub struct ReconcileController {
    reconciler: Arc<BackendReconciler>,
    targets: Vec<LoadBalancerTarget>,
    interval: Duration,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

impl ReconcileController {
    pub fn new(
        reconciler: Arc<BackendReconciler>,
        targets: Vec<LoadBalancerTarget>,
        interval: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        Self {
            reconciler,
            targets,
            interval,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub async fn start(self: Arc<Self>) {
        info!(
            "Starting reconcile controller for {} load balancers with interval: {:?}",
            self.targets.len(),
            self.interval
        );

        let tasks: Vec<_> = (0..self.targets.len())
            .map(|index| {
                let controller = self.clone();
                tokio::spawn(async move { controller.run_target(index).await })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                warn!("Reconcile task join error: {}", e);
            }
        }

        info!("Reconcile controller stopped");
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    async fn run_target(&self, index: usize) {
        let target = &self.targets[index];
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self
                        .reconciler
                        .reconcile(&target.service, &target.nodes, &target.id)
                        .await
                    {
                        Ok(report) if report.plan.is_empty() => {
                            debug!("Load balancer {} already converged", target.id);
                        }
                        Ok(report) => info!(
                            "Reconciled {}: {} added, {} drained, {} removed",
                            target.id,
                            report.plan.to_add.len(),
                            report.plan.to_change_weight.len(),
                            report.plan.to_delete.len()
                        ),
                        Err(e) => warn!(
                            "Reconcile of {} failed, retrying next tick: {:#}",
                            target.id,
                            anyhow::Error::new(e)
                        ),
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Reconcile task for {} shutting down", target.id);
                        break;
                    }
                }
            }
        }
    }
}
