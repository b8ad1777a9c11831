// src/metrics/collector.rs
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;
use anyhow::Result;

use crate::reconciler::ReconcilePlan;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        buffer
    }
}

pub struct MetricsCollector {
    // Pass metrics
    pub reconcile_passes_total: IntCounterVec,
    pub reconcile_duration_seconds: HistogramVec,

    // Plan metrics
    pub backends_added_total: IntCounterVec,
    pub backends_drained_total: IntCounterVec,
    pub backends_deleted_total: IntCounterVec,

    // Capacity metrics
    pub target_capacity: IntGaugeVec,
    pub candidate_nodes: IntGaugeVec,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let reconcile_passes_total = IntCounterVec::new(
            Opts::new("reconciler_passes_total", "Total number of reconcile passes"),
            &["load_balancer", "result"],
        )?;
        registry.register(Box::new(reconcile_passes_total.clone()))?;

        let reconcile_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "reconciler_pass_duration_seconds",
                "Reconcile pass duration in seconds",
            ),
            &["load_balancer"],
        )?;
        registry.register(Box::new(reconcile_duration_seconds.clone()))?;

        let backends_added_total = IntCounterVec::new(
            Opts::new("reconciler_backends_added_total", "Backends registered"),
            &["load_balancer"],
        )?;
        registry.register(Box::new(backends_added_total.clone()))?;

        let backends_drained_total = IntCounterVec::new(
            Opts::new(
                "reconciler_backends_drained_total",
                "Backends set to weight 0",
            ),
            &["load_balancer"],
        )?;
        registry.register(Box::new(backends_drained_total.clone()))?;

        let backends_deleted_total = IntCounterVec::new(
            Opts::new("reconciler_backends_deleted_total", "Backends removed"),
            &["load_balancer"],
        )?;
        registry.register(Box::new(backends_deleted_total.clone()))?;

        let target_capacity = IntGaugeVec::new(
            Opts::new(
                "reconciler_target_capacity",
                "Target number of serving backends",
            ),
            &["load_balancer"],
        )?;
        registry.register(Box::new(target_capacity.clone()))?;

        let candidate_nodes = IntGaugeVec::new(
            Opts::new(
                "reconciler_candidate_nodes",
                "Nodes eligible to receive traffic",
            ),
            &["load_balancer"],
        )?;
        registry.register(Box::new(candidate_nodes.clone()))?;

        Ok(Self {
            reconcile_passes_total,
            reconcile_duration_seconds,
            backends_added_total,
            backends_drained_total,
            backends_deleted_total,
            target_capacity,
            candidate_nodes,
        })
    }

    pub fn record_pass(&self, load_balancer: &str, result: &str, duration: std::time::Duration) {
        self.reconcile_passes_total
            .with_label_values(&[load_balancer, result])
            .inc();

        self.reconcile_duration_seconds
            .with_label_values(&[load_balancer])
            .observe(duration.as_secs_f64());
    }

    pub fn update_capacity(&self, load_balancer: &str, target: usize, candidates: usize) {
        self.target_capacity
            .with_label_values(&[load_balancer])
            .set(target as i64);
        self.candidate_nodes
            .with_label_values(&[load_balancer])
            .set(candidates as i64);
    }

    /// Count the mutations of a plan that was applied in full.
    pub fn record_plan(&self, load_balancer: &str, plan: &ReconcilePlan) {
        self.backends_added_total
            .with_label_values(&[load_balancer])
            .inc_by(plan.to_add.len() as u64);
        self.backends_drained_total
            .with_label_values(&[load_balancer])
            .inc_by(plan.to_change_weight.len() as u64);
        self.backends_deleted_total
            .with_label_values(&[load_balancer])
            .inc_by(plan.to_delete.len() as u64);
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BackendServer;

    #[test]
    fn test_plan_counters_exported() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.collector();
        let plan = ReconcilePlan {
            to_add: vec![BackendServer::new("i-1", 100), BackendServer::new("i-2", 100)],
            to_change_weight: vec![BackendServer::drained("i-3")],
            to_delete: Vec::new(),
        };

        metrics.record_plan("lb-1", &plan);
        metrics.update_capacity("lb-1", 2, 5);
        metrics.record_pass("lb-1", "success", std::time::Duration::from_millis(5));

        let text = String::from_utf8(registry.gather()).unwrap();
        assert!(text.contains("reconciler_backends_added_total{load_balancer=\"lb-1\"} 2"));
        assert!(text.contains("reconciler_backends_drained_total{load_balancer=\"lb-1\"} 1"));
        assert!(text.contains("reconciler_target_capacity{load_balancer=\"lb-1\"} 2"));
        assert!(text.contains("reconciler_passes_total{load_balancer=\"lb-1\",result=\"success\"} 1"));
    }
}
